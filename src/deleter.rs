// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Tears a workspace's NAT gateway down and releases its Elastic IP.
//!
//! [`NatGatewayDeleter::locate`] resolves the available gateway in the
//! workspace's NAT subnet and the Elastic IP allocation behind it, then
//! [`NatGatewayDeleter::run`] walks four steps:
//!
//! 1. Log the routes of the main route table as a diagnostic snapshot.
//! 2. Delete the `0.0.0.0/0` route when one exists.
//! 3. Delete the gateway and poll until EC2 confirms the deletion.
//! 4. Release the Elastic IP allocation.
//!
//! The first two steps are best-effort: their failures are logged and
//! swallowed so a half-torn-down workspace can still be cleaned up. The
//! last two steps must succeed, otherwise the gateway or the allocation
//! would keep billing.

use tokio::time::Instant;

use crate::constants::{
    DEFAULT_ROUTE_CIDR, GATEWAY_DELETED_POLL_INTERVAL, GATEWAY_DELETED_TIMEOUT,
};
use crate::ec2::Ec2Api;
use crate::errors::AppError;
use crate::locator::{WorkspaceNetwork, exactly_one};
use crate::models::{NatGateway, NatGatewayState};

/// The available NAT gateway living in the given subnet. Gateways in
/// other subnets or other lifecycle states never match.
#[tracing::instrument(skip(ec2))]
pub async fn find_nat_gateway(ec2: &dyn Ec2Api, subnet_id: &str) -> Result<String, AppError> {
    let gateways = ec2.describe_nat_gateways().await?;
    let matched: Vec<NatGateway> = gateways
        .into_iter()
        .filter(|gateway| {
            gateway.subnet_id == subnet_id && gateway.state == NatGatewayState::Available
        })
        .collect();
    let gateway = exactly_one(
        matched,
        format!("available NAT gateway in subnet '{subnet_id}'"),
    )?;
    Ok(gateway.nat_gateway_id)
}

/// The Elastic IP allocation behind a NAT gateway, read from the first
/// address of a fresh by-id describe.
#[tracing::instrument(skip(ec2))]
pub async fn find_elastic_ip(ec2: &dyn Ec2Api, nat_gateway_id: &str) -> Result<String, AppError> {
    let gateway = ec2
        .describe_nat_gateway(nat_gateway_id)
        .await?
        .ok_or_else(|| AppError::Lookup {
            what: format!("NAT gateway '{nat_gateway_id}'"),
            count: 0,
        })?;
    gateway
        .addresses
        .first()
        .and_then(|address| address.allocation_id.clone())
        .ok_or_else(|| AppError::Lookup {
            what: format!("Elastic IP allocation on NAT gateway '{nat_gateway_id}'"),
            count: 0,
        })
}

pub struct NatGatewayDeleter<'a> {
    ec2: &'a dyn Ec2Api,
    network: &'a WorkspaceNetwork,
    nat_gateway_id: String,
    allocation_id: String,
}

impl<'a> NatGatewayDeleter<'a> {
    /// Resolves the gateway and its allocation before anything is torn
    /// down, so a failed lookup leaves the workspace untouched.
    #[tracing::instrument(skip(ec2, network))]
    pub async fn locate(
        ec2: &'a dyn Ec2Api,
        network: &'a WorkspaceNetwork,
    ) -> Result<NatGatewayDeleter<'a>, AppError> {
        let nat_gateway_id = find_nat_gateway(ec2, &network.nat_subnet_id).await?;
        let allocation_id = find_elastic_ip(ec2, &nat_gateway_id).await?;
        tracing::info!(
            "[nat] tearing down NAT gateway {nat_gateway_id} holding Elastic IP {allocation_id}"
        );
        Ok(Self {
            ec2,
            network,
            nat_gateway_id,
            allocation_id,
        })
    }

    /// Runs the full teardown.
    #[tracing::instrument(skip(self))]
    pub async fn run(&self) -> Result<(), AppError> {
        self.log_current_routes().await;
        self.delete_default_route().await;
        self.delete_nat_gateway().await?;
        self.release_elastic_ip().await
    }

    /// Logs every route of the main route table. Never fails; an
    /// unreadable table is logged and skipped.
    pub async fn log_current_routes(&self) {
        let route_table_id = &self.network.route_table_id;
        match self.ec2.describe_route_table(route_table_id).await {
            Ok(table) => {
                tracing::info!("[nat] routes in route table {route_table_id}:");
                for route in &table.routes {
                    tracing::info!(
                        "[nat]   destination {}, target {}, state {}",
                        route.destination_cidr_block.as_deref().unwrap_or("none"),
                        route.target().unwrap_or("none"),
                        route.state.as_deref().unwrap_or("none"),
                    );
                }
            }
            Err(err) => {
                tracing::error!("[nat] could not list routes of {route_table_id}: {err}");
            }
        }
    }

    /// Deletes the `0.0.0.0/0` route when the table still has one. Any
    /// failure here is logged and swallowed so the gateway itself still
    /// gets deleted.
    pub async fn delete_default_route(&self) {
        let route_table_id = &self.network.route_table_id;
        match self.remove_default_route().await {
            Ok(true) => {
                tracing::info!(
                    "[nat] deleted {DEFAULT_ROUTE_CIDR} route from route table {route_table_id}"
                );
            }
            Ok(false) => {
                tracing::warn!(
                    "[nat] no {DEFAULT_ROUTE_CIDR} route in route table {route_table_id}"
                );
            }
            Err(err) => {
                tracing::error!(
                    "[nat] failed to delete the {DEFAULT_ROUTE_CIDR} route from {route_table_id}: {err}"
                );
            }
        }
    }

    async fn remove_default_route(&self) -> Result<bool, AppError> {
        let route_table_id = &self.network.route_table_id;
        let table = self.ec2.describe_route_table(route_table_id).await?;
        match table.route_to(DEFAULT_ROUTE_CIDR) {
            Some(_) => self.ec2.delete_route(route_table_id, DEFAULT_ROUTE_CIDR).await,
            None => Ok(false),
        }
    }

    /// Deletes the gateway and polls until EC2 confirms. A gateway that
    /// is gone entirely counts as confirmed.
    ///
    /// # Errors
    ///
    /// [`AppError::WaitTimeout`] when the gateway is still not deleted
    /// after [`GATEWAY_DELETED_TIMEOUT`].
    #[tracing::instrument(skip(self))]
    pub async fn delete_nat_gateway(&self) -> Result<(), AppError> {
        let nat_gateway_id = &self.nat_gateway_id;
        self.ec2.delete_nat_gateway(nat_gateway_id).await?;
        tracing::info!("[nat] NAT gateway {nat_gateway_id} is deleting");
        let started = Instant::now();
        loop {
            match self.ec2.describe_nat_gateway(nat_gateway_id).await? {
                None => break,
                Some(gateway) if gateway.state == NatGatewayState::Deleted => break,
                Some(gateway) => {
                    tracing::info!("[nat] NAT gateway {nat_gateway_id} is {}", gateway.state);
                }
            }
            if started.elapsed() >= GATEWAY_DELETED_TIMEOUT {
                return Err(AppError::WaitTimeout {
                    what: format!("NAT gateway {nat_gateway_id} to be deleted"),
                    waited: started.elapsed(),
                });
            }
            tokio::time::sleep(GATEWAY_DELETED_POLL_INTERVAL).await;
        }
        tracing::info!("[nat] NAT gateway {nat_gateway_id} deleted");
        Ok(())
    }

    /// Releases the Elastic IP the gateway was holding.
    #[tracing::instrument(skip(self))]
    pub async fn release_elastic_ip(&self) -> Result<(), AppError> {
        self.ec2.release_address(&self.allocation_id).await?;
        tracing::info!("[nat] released Elastic IP {}", self.allocation_id);
        Ok(())
    }
}
