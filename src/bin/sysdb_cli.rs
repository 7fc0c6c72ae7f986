use std::{
    error::Error,
    io::{self, BufRead, Write},
    process,
    sync::Arc,
};

use clap::Parser;
use sysdb::{Client, ClientConfig, config::default_pool_size};

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Server address: host:port, an absolute socket path or unix:<path>
    address: String,
    /// User to connect as
    #[arg(short, long)]
    user: String,
    /// Number of pooled connections
    #[arg(long, default_value_t = default_pool_size())]
    pool_size: usize,
    /// Print the server version and exit
    #[arg(long)]
    server_version: bool,
    /// Query to execute; reads queries from stdin when omitted
    query: Option<String>,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let cli = Cli::parse();
    let config = ClientConfig::new(cli.address, cli.user).with_pool_size(cli.pool_size);
    let client = Arc::new(Client::connect(&config)?);

    let handle = Arc::clone(&client);
    ctrlc::set_handler(move || {
        handle.close();
        process::exit(130);
    })?;

    if cli.server_version {
        println!("{}", client.server_version()?);
    } else if let Some(query) = cli.query {
        run(&client, &query)?;
    } else {
        prompt(&client)?;
    }

    client.close();
    Ok(())
}

fn run(client: &Client, query: &str) -> Result<(), Box<dyn Error>> {
    let result = client.query(query)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn prompt(client: &Client) -> Result<(), Box<dyn Error>> {
    let mut stdin = io::stdin().lock();
    let mut stdout = io::stdout().lock();

    loop {
        let mut line = String::default();

        write!(&mut stdout, "> ")?;
        stdout.flush()?;

        if stdin.read_line(&mut line)? == 0 {
            break;
        }

        match line.trim() {
            "" => continue,
            ".exit" => break,
            query => {
                if let Err(e) = run(client, query) {
                    eprintln!("error: {e}");
                }
            }
        }
    }

    Ok(())
}
