//! CAP capability negotiation.
//!
//! The server advertises no capabilities; CAP exists so clients that open
//! with `CAP LS 302` do not stall before PASS. `LS` gets an empty listing,
//! `END` is accepted silently, anything else is ignored.

use crate::error::CommandResult;
use crate::handlers::{Context, Gate, Handler};
use async_trait::async_trait;
use fennec_proto::{Message, Response};
use tracing::debug;

pub struct CapHandler;

#[async_trait]
impl Handler for CapHandler {
    fn gate(&self) -> Gate {
        Gate::Open
    }

    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> CommandResult {
        match msg.arg(0).map(str::to_ascii_uppercase).as_deref() {
            Some("LS") => ctx.reply(Response::cap_ls()),
            Some("END") | None => Ok(()),
            Some(sub) => {
                debug!(conn = ctx.conn, subcommand = %sub, "Ignoring CAP subcommand");
                Ok(())
            }
        }
    }
}
