// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use clap::{Parser, Subcommand};

/// Create or delete the NAT gateway of a Databricks workspace VPC.
#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct NatOptions {
    /// Databricks workspace id. The workspace VPC is found through its
    /// Name tag, which contains `workerenv-<workspace id>`.
    #[arg(long, env("WORKSPACE_NAT_WORKSPACE_ID"))]
    pub workspace_id: String,

    /// AWS profile to load credentials from. Falls back to the default
    /// credential chain when unset.
    #[arg(long, env("WORKSPACE_NAT_PROFILE"))]
    pub profile: Option<String>,

    /// AWS region to operate in. Falls back to the profile or
    /// environment region when unset.
    #[arg(long, env("WORKSPACE_NAT_REGION"))]
    pub region: Option<String>,

    #[command(subcommand)]
    pub command: NatCommand,
}

#[derive(Debug, Clone, Subcommand)]
pub enum NatCommand {
    /// Create the NAT gateway and route the workspace's traffic through it
    Create,
    /// Tear the NAT gateway down and release its Elastic IP
    Delete,
}
