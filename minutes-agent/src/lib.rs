//! Meeting-minutes demo agent.
//!
//! Glue between a llama-stack agent runtime and the Drive MCP toolgroup:
//! registers the toolgroup, creates an agent with a fixed instruction string,
//! and drives a scripted or interactive prompt loop. See [`stack`] for the
//! REST client and [`prompt`] for the minutes template.

pub mod prompt;
pub mod stack;
