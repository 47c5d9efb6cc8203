//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Interactive command-line front end for the trading core. Each command reduces to one
// TradingSystem call and prints the result or a human-readable error; the core itself
// knows nothing about this surface.
//--------------------------------------------------------------------------------------------------

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use uuid::Uuid;

use equity_matching::config::Config;
use equity_matching::{
    InMemoryStore, OrderBook, Side, TradingError, TradingSystem, User,
};

const HELP: &str = "\
commands:
  place|p <user> <buy|sell> <symbol> <qty> <price>   place a limit order
  cancel|c <symbol> <order-id>                       cancel a resting order
  status|s <order-id>                                show an order's status
  order-book|ob <symbol>                             show a symbol's book
  trades|t                                           show the trade log
  exit|e                                             quit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    info!("starting {}", config.app_id);

    let store = match &config.snapshot_path {
        Some(path) => Arc::new(
            InMemoryStore::from_snapshot_file(path)
                .with_context(|| format!("loading snapshot {}", path.display()))?,
        ),
        None => Arc::new(InMemoryStore::new()),
    };
    let system = TradingSystem::new(store);

    if config.snapshot_path.is_none() {
        // Preload a couple of demo users so the prompt is usable out of the box.
        for user in [User::new("user1", "Alice"), User::new("user2", "Bob")] {
            system.register_user(user).await?;
        }
    }

    // Prime matching for any pre-loaded books.
    let trades = system.sweep().await?;
    if !trades.is_empty() {
        println!("startup sweep produced {} trade(s):", trades.len());
        for trade in &trades {
            println!("  {trade}");
        }
    }

    println!("equity matching CLI (type 'help' for commands)");
    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, args)) = tokens.split_first() else {
            continue;
        };

        match command {
            "place" | "p" => place(&system, args).await,
            "cancel" | "c" => cancel(&system, args).await,
            "status" | "s" => status(&system, args).await,
            "order-book" | "ob" => order_book(&system, args).await,
            "trades" | "t" => trades_log(&system).await,
            "help" | "h" => println!("{HELP}"),
            "exit" | "e" => break,
            other => println!("unknown command '{other}' (type 'help' for commands)"),
        }
    }

    Ok(())
}

async fn place(system: &TradingSystem, args: &[&str]) {
    let [user, side, symbol, qty, price] = args else {
        println!("usage: place <user> <buy|sell> <symbol> <qty> <price>");
        return;
    };
    let side = match side.parse::<Side>() {
        Ok(side) => side,
        Err(err) => return println!("{err}"),
    };
    let qty = match qty.parse::<u64>() {
        Ok(qty) => qty,
        Err(_) => return println!("invalid quantity '{qty}'"),
    };
    let price = match price.parse() {
        Ok(price) => price,
        Err(_) => return println!("invalid price '{price}'"),
    };

    match system.place_order(user, side, symbol, qty, price).await {
        Ok(order) => println!("order placed: {order}"),
        Err(err) => report(err),
    }
}

async fn cancel(system: &TradingSystem, args: &[&str]) {
    let [symbol, order_id] = args else {
        println!("usage: cancel <symbol> <order-id>");
        return;
    };
    let Ok(order_id) = Uuid::parse_str(order_id) else {
        println!("invalid order id '{order_id}'");
        return;
    };
    match system.cancel_order(symbol, order_id).await {
        Ok(order) => println!("order is now {}: {order}", order.status),
        Err(err) => report(err),
    }
}

async fn status(system: &TradingSystem, args: &[&str]) {
    let [order_id] = args else {
        println!("usage: status <order-id>");
        return;
    };
    let Ok(order_id) = Uuid::parse_str(order_id) else {
        println!("invalid order id '{order_id}'");
        return;
    };
    match system.order_status(order_id).await {
        Ok(order) => println!("{order}"),
        Err(err) => report(err),
    }
}

async fn order_book(system: &TradingSystem, args: &[&str]) {
    let [symbol] = args else {
        println!("usage: order-book <symbol>");
        return;
    };
    match system.order_book(symbol).await {
        Ok(book) => print_book(&book),
        Err(err) => report(err),
    }
}

async fn trades_log(system: &TradingSystem) {
    match system.trades().await {
        Ok(trades) if trades.is_empty() => println!("no trades yet"),
        Ok(trades) => {
            for trade in trades {
                println!("{trade}");
            }
        }
        Err(err) => report(err),
    }
}

fn print_book(book: &OrderBook) {
    println!("--- {} ---", book.symbol());
    println!("asks:");
    for order in book.iter_side(Side::Sell) {
        println!("  {} x{} ({})", order.price, order.quantity, order.id);
    }
    println!("bids:");
    for order in book.iter_side(Side::Buy) {
        println!("  {} x{} ({})", order.price, order.quantity, order.id);
    }
    if book.is_empty() {
        println!("(empty)");
    }
}

fn report(err: TradingError) {
    println!("error: {err}");
}
