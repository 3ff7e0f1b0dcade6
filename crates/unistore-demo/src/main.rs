use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use unistore::{lens, reducer, ActionQueues, Module, Store, StoreExt, Stores};
use unistore_config::StoreConfig;

mod actions;
mod commands;
mod logger;
mod middleware;
mod reducers;
mod state;

use actions::{Action, QueueKey, StatusAction};
use commands::Command;
use middleware::ClampMiddleware;
use reducers::{reduce_session, reduce_status, select_status, CounterReducer};
use state::{AppState, CounterState, SessionState};

const ADD_LIMIT: i64 = 100;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log_file = logger::init()?;
    log::info!("Starting unistore-demo, logging to {}", log_file.display());

    let config = StoreConfig::load();
    let app = Store::builder(AppState::default())
        .config(StoreConfig {
            name: "app".to_string(),
            ..config.clone()
        })
        .middleware(ClampMiddleware::new(ADD_LIMIT))
        .build()?;
    let session = Store::builder(SessionState::default())
        .config(StoreConfig {
            name: "session".to_string(),
            ..config
        })
        .build()?;

    // Each slice is owned by its own reducer through a lens
    let counter = app.substore(lens!(AppState, counter));
    counter.connect(Module::new(CounterReducer));
    app.connect_lens(reducer::on(select_status, reduce_status), lens!(AppState, status));

    let stores = Stores::new(Arc::clone(&app), Arc::clone(&session));
    stores.connect_fn(reduce_session);

    counter.subscribe_fn(|counter: &CounterState, old: Option<&CounterState>| {
        if old.is_some() {
            println!("counter: {}", counter.value);
        }
    });
    let status = app.substore(lens!(AppState, status.message));
    status.subscribe_fn(|message: &Option<String>, _| {
        if let Some(message) = message {
            println!("status: {}", message);
        }
    });

    // User input goes through a lockable queue into the paired store
    let queues: ActionQueues<Action> = ActionQueues::new();
    let input = queues.get(QueueKey::Input);
    input.forward_to(&stores);

    println!("{}", commands::HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match commands::parse(&line) {
            Ok(Command::Dispatch(action)) => input.send(action),
            Ok(Command::Lock) => {
                input.lock();
                println!("{} locked", QueueKey::Input);
            }
            Ok(Command::Unlock) => {
                println!("{} unlocked, releasing {}", QueueKey::Input, input.len());
                input.unlock();
            }
            Ok(Command::Help) => println!("{}", commands::HELP),
            Ok(Command::Quit) => break,
            Err(err) => println!("{:#}", err),
        }
    }

    if input.is_locked() && !input.is_empty() {
        println!("discarding {} queued actions", input.len());
    }

    // Wait for everything already dispatched to settle
    let pair = stores
        .dispatch_async(Action::Status(StatusAction::Busy(false)))
        .await?;
    println!(
        "final counter {} after {} commands",
        pair.a.counter.value, pair.b.commands
    );
    log::info!(
        "Exiting unistore-demo, {} subscribers on app store",
        app.subscriber_count()
    );
    Ok(())
}
