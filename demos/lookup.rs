use std::{env, io, net::Ipv4Addr, time::Duration};

use lanname::resolver::{Lookup, SyncResolver};
use log::LevelFilter;

fn main() -> io::Result<()> {
    env_logger::Builder::new()
        .filter_module("lanname", LevelFilter::Debug)
        .filter_module(env!("CARGO_CRATE_NAME"), LevelFilter::Trace)
        .init();

    let mut args = env::args().skip(1);
    let addr: Ipv4Addr = match args.next().map(|arg| arg.parse()) {
        Some(Ok(addr)) => addr,
        _ => {
            eprintln!("usage: lookup <ipv4-address> [timeout-ms]");
            std::process::exit(1);
        }
    };

    let mut resolver = SyncResolver::new()?;
    if let Some(Ok(ms)) = args.next().map(|arg| arg.parse()) {
        resolver.set_timeout(Duration::from_millis(ms));
    }
    match resolver.lookup_hostname(addr)? {
        Lookup::Resolved(hostname) => println!("{}: {}", addr, hostname),
        Lookup::NoResponse => println!("{}: no response", addr),
    }
    Ok(())
}
