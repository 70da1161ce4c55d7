// SPDX-License-Identifier: BUSL-1.1

//! Natural-language SQL generation through an OpenAI-compatible completion
//! API (DeepSeek by default), with a local safety pass over the result.

pub mod context;
pub mod gateway;
pub mod provider;
pub mod safety;
pub mod types;

pub use gateway::AiGateway;
pub use types::{AiConfig, AiError};
