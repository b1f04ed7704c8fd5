// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! # Workspace NAT Gateway Tool
//!
//! Command line tool that toggles the NAT gateway of a Databricks
//! workspace VPC. The workspace is identified by its id alone; every
//! resource is found through the tag conventions Databricks applies to
//! the VPCs it provisions.
//!
//! ## Architecture
//!
//! ```text
//!            +-----------------------------------------------+
//!  create    | AllocateAddress -> CreateNatGateway           |
//!  --------> | -> poll until available                       |
//!            | -> rewrite 0.0.0.0/0 in the main route table  |
//!            +-----------------------------------------------+
//!
//!            +-----------------------------------------------+
//!  delete    | log routes -> delete 0.0.0.0/0 route          |
//!  --------> | -> DeleteNatGateway -> poll until deleted     |
//!            | -> ReleaseAddress                             |
//!            +-----------------------------------------------+
//! ```
//!
//! ## Modules
//!
//! - [`application`]: Wires the CLI options to the chosen workflow
//! - [`configuration`]: Command line and environment options
//! - [`constants`]: Tag conventions, poll intervals and wait budgets
//! - [`creator`]: Provisioning workflow
//! - [`deleter`]: Teardown workflow
//! - [`ec2`]: EC2 control plane seam and the AWS SDK implementation
//! - [`errors`]: Application error types
//! - [`locator`]: Tag-based workspace network lookups
//! - [`models`]: Domain views of the EC2 resource types
//!
//! ## Usage
//!
//! ```bash
//! # route the workspace's traffic through a new NAT gateway
//! workspace-nat --workspace-id 1018030004293411 create
//!
//! # tear the gateway down again and release its Elastic IP
//! workspace-nat --workspace-id 1018030004293411 delete
//! ```
//!
//! Both workflows abort before touching anything when the workspace's
//! VPC, main route table or NAT subnet cannot be resolved to exactly
//! one resource. Creation failures leave already provisioned resources
//! in place; the `delete` command is the cleanup path.

pub mod application;
pub mod configuration;
pub mod constants;
pub mod creator;
pub mod deleter;
pub mod ec2;
pub mod errors;
pub mod locator;
pub mod models;
