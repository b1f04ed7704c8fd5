// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::time::Duration;

/// Databricks tags every workspace VPC with a Name containing `workerenv-<workspace id>`.
pub const WORKSPACE_VPC_TAG_PREFIX: &str = "workerenv-";

/// Name tag of the subnet reserved for the NAT gateway.
pub const NAT_SUBNET_TAG: &str = "nat-gateway-subnet";

/// Destination of the route both workflows rewrite.
pub const DEFAULT_ROUTE_CIDR: &str = "0.0.0.0/0";

/// How often a freshly created gateway is polled while it is still pending.
pub const GATEWAY_AVAILABLE_POLL_INTERVAL: Duration = Duration::from_secs(30);
pub const GATEWAY_AVAILABLE_TIMEOUT: Duration = Duration::from_secs(600);

/// How often a deleted gateway is polled until EC2 confirms the deletion.
pub const GATEWAY_DELETED_POLL_INTERVAL: Duration = Duration::from_secs(15);
pub const GATEWAY_DELETED_TIMEOUT: Duration = Duration::from_secs(600);

// EC2 error codes that the workflows treat as benign answers rather than failures.
pub const ROUTE_NOT_FOUND: &str = "InvalidRoute.NotFound";
pub const NAT_GATEWAY_NOT_FOUND: &str = "NatGatewayNotFound";
