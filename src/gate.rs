// src/gate.rs
use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use clap::Args;

use crate::auth::{digest_hex, AuthGate, AuthMismatch, FileSession, SessionStore};
use crate::config::DashboardConfig;
use crate::telemetry;
use crate::telemetry::ctx::{LogCtx, OpMarker};
use crate::telemetry::ops::unlock::Phase as UnlockPhase;

/// `opsdash unlock`
#[derive(Args, Debug)]
pub struct UnlockCmd {
    /// Password to submit; prompts on stdin when omitted
    #[arg(long)]
    password: Option<String>,
}

/// `opsdash digest <password>`
#[derive(Args, Debug)]
pub struct DigestCmd {
    password: String,
}

pub fn unlock(config: &DashboardConfig, args: UnlockCmd) -> Result<()> {
    let log = telemetry::unlock();
    let _g = log
        .root_span_kv([("session_file", config.session_file.display().to_string())])
        .entered();
    let mut gate = AuthGate::new(config, FileSession::new(&config.session_file));
    {
        let _s = log.span(&UnlockPhase::Verify).entered();
        ensure_unlocked(&mut gate, args.password, &log)?;
    }
    let _s = log.span(&UnlockPhase::Persist).entered();
    let session = gate.into_session();
    if session.is_unlocked() {
        log.info("🔓 Session unlocked");
    } else {
        log.warn(format!(
            "Unlocked for this run only; could not write the session marker at {}",
            session.path().display()
        ));
    }
    Ok(())
}

pub fn lock(config: &DashboardConfig) -> Result<()> {
    let log = telemetry::unlock();
    let mut gate = AuthGate::new(config, FileSession::new(&config.session_file));
    gate.lock()
        .with_context(|| format!("clear session marker {}", config.session_file.display()))?;
    log.info("🔒 Session locked");
    Ok(())
}

pub fn digest(args: DigestCmd) -> Result<()> {
    println!("{}", digest_hex(&args.password));
    Ok(())
}

/// Opens the gate or fails. With an explicit password there is exactly one
/// attempt; otherwise stdin is prompted until a match or EOF.
pub fn ensure_unlocked<S, O>(gate: &mut AuthGate<S>, password: Option<String>, log: &LogCtx<O>) -> Result<()>
where
    S: SessionStore,
    O: OpMarker,
{
    if gate.is_unlocked() {
        log.debug("session already unlocked");
        return Ok(());
    }
    if let Some(candidate) = password {
        return gate.submit(candidate).map(|_| ()).map_err(|e| {
            log.warn("password rejected");
            anyhow::Error::new(e)
        });
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        eprint!("Password: ");
        io::stderr().flush()?;
        let Some(line) = lines.next() else {
            return Err(anyhow::Error::new(AuthMismatch));
        };
        let candidate = line.context("read password")?;
        match gate.submit(candidate) {
            Ok(_) => return Ok(()),
            Err(e) => {
                log.warn("password rejected");
                eprintln!("{e}");
            }
        }
    }
}
