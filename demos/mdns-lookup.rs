use std::{env, io, net::Ipv4Addr};

use lanname::resolver::{Lookup, SyncResolver};
use log::LevelFilter;

fn main() -> io::Result<()> {
    env_logger::Builder::new()
        .filter_module("lanname", LevelFilter::Trace)
        .filter_module(env!("CARGO_CRATE_NAME"), LevelFilter::Trace)
        .init();

    let addr: Ipv4Addr = match env::args().nth(1).map(|arg| arg.parse()) {
        Some(Ok(addr)) => addr,
        _ => {
            eprintln!("usage: mdns-lookup <ipv4-address>");
            std::process::exit(1);
        }
    };

    let mut resolver = SyncResolver::new()?;
    match resolver.lookup_mdns(addr)? {
        Lookup::Resolved(name) => println!("{}: {}", addr, name),
        Lookup::NoResponse => println!("{}: no response", addr),
    }
    Ok(())
}
