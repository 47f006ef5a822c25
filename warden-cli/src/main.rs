//! Warden probe entry point.
//!
//! Runs a single identify or authorize call through the full stack (Redis
//! cache, things service, resolver) and prints the answer.

mod args;
mod telemetry;

use std::process::ExitCode;
use std::sync::Arc;

use tracing::warn;
use warden_authority::{GrpcAuthority, RemoteAuthority};
use warden_cache::{CacheStore, InMemoryCacheStore, RedisCacheStore};
use warden_core::{
    AccessControl, CallContext, CancellationToken, WardenConfig, WardenResult,
};
use warden_resolver::AccessResolver;

use crate::args::{Args, Command, USAGE};

#[tokio::main]
async fn main() -> ExitCode {
    let args = match args::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}", message);
            if message != USAGE {
                eprintln!("{}", USAGE);
            }
            return ExitCode::from(2);
        }
    };

    match run(args).await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> WardenResult<String> {
    let config = WardenConfig::load_from(args.config)?;
    telemetry::init_tracing(&config.telemetry)?;

    let cache: Arc<dyn CacheStore> = match RedisCacheStore::connect(&config.cache).await {
        Ok(store) => Arc::new(store),
        Err(err) => {
            // Every lookup misses, so answers come from the authority.
            warn!(error = %err, "Cache store unreachable, resolving remotely only");
            Arc::new(InMemoryCacheStore::new())
        }
    };
    let authority: Arc<dyn RemoteAuthority> = Arc::new(GrpcAuthority::connect_lazy(&config.authority)?);
    let resolver: AccessResolver<dyn CacheStore, dyn RemoteAuthority> =
        AccessResolver::new(cache, authority, config.resolver.clone());

    let token = CancellationToken::new();
    let on_interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });
    let budget = config.resolver.cache_timeout() + config.resolver.authority_timeout();
    let ctx = CallContext::with_timeout(budget).with_cancellation(token);

    match args.command {
        Command::Identify { thing_key } => {
            let thing_id = resolver.identify(&ctx, &thing_key).await?;
            Ok(thing_id.to_string())
        }
        Command::Authorize {
            channel_id,
            thing_id,
        } => {
            resolver.authorize(&ctx, &channel_id, &thing_id).await?;
            Ok("granted".to_string())
        }
    }
}
