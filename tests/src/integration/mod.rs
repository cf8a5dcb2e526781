//! # Integration Flows
//!
//! Every flow runs the crates together the way the `lead-desk` binary wires
//! them, with a manual clock and a recording mailer in place of the wall
//! clock and the SMTP relay.

#[cfg(test)]
mod support;

#[cfg(test)]
mod intake_flows;

#[cfg(test)]
mod office_flows;

#[cfg(test)]
mod runtime_flows;
