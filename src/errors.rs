// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::time::Duration;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum AppError {
    #[error("expected exactly one {what}, found {count}")]
    Lookup { what: String, count: usize },

    #[error("{0}")]
    Provider(String),

    #[error("NAT gateway {nat_gateway_id} is in an unexpected state: {state}")]
    UnexpectedState {
        nat_gateway_id: String,
        state: String,
    },

    #[error("timed out after {waited:?} waiting for {what}")]
    WaitTimeout { what: String, waited: Duration },
}
