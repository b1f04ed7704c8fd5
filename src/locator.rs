// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Resolves a Databricks workspace id to the network pieces both
//! workflows operate on.
//!
//! The lookups lean entirely on tag conventions:
//!
//! 1. The workspace VPC is the one whose `Name` tag contains
//!    `workerenv-<workspace id>`.
//! 2. The route table is the VPC's main route table.
//! 3. The NAT subnet is the one whose `Name` tag contains
//!    `nat-gateway-subnet`.
//!
//! Each lookup must resolve to exactly one resource. Zero matches and
//! several matches both abort with [`AppError::Lookup`] carrying the
//! observed count, so nothing is ever created against a guessed VPC.

use crate::constants::{NAT_SUBNET_TAG, WORKSPACE_VPC_TAG_PREFIX};
use crate::ec2::Ec2Api;
use crate::errors::AppError;
use crate::models::{Subnet, Vpc};

/// The per-workspace network resolved by [`ResourceLocator::discover`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceNetwork {
    pub vpc_id: String,
    pub route_table_id: String,
    pub nat_subnet_id: String,
}

pub struct ResourceLocator<'a> {
    ec2: &'a dyn Ec2Api,
}

impl<'a> ResourceLocator<'a> {
    pub fn new(ec2: &'a dyn Ec2Api) -> Self {
        Self { ec2 }
    }

    /// Runs the three lookups and bundles the result.
    #[tracing::instrument(skip(self))]
    pub async fn discover(&self, workspace_id: &str) -> Result<WorkspaceNetwork, AppError> {
        let vpc_id = self.find_vpc(workspace_id).await?;
        let route_table_id = self.find_main_route_table(&vpc_id).await?;
        let nat_subnet_id = self.find_nat_subnet(&vpc_id).await?;
        Ok(WorkspaceNetwork {
            vpc_id,
            route_table_id,
            nat_subnet_id,
        })
    }

    /// The VPC whose `Name` tag contains `workerenv-<workspace id>`.
    pub async fn find_vpc(&self, workspace_id: &str) -> Result<String, AppError> {
        let needle = format!("{WORKSPACE_VPC_TAG_PREFIX}{workspace_id}");
        let vpcs = self.ec2.describe_vpcs().await?;
        let matched: Vec<Vpc> = vpcs
            .into_iter()
            .filter(|vpc| vpc.name_tag().is_some_and(|name| name.contains(&needle)))
            .collect();
        let vpc = exactly_one(matched, format!("VPC with Name tag containing '{needle}'"))?;
        tracing::info!("[nat] workspace {workspace_id} runs in VPC {}", vpc.vpc_id);
        Ok(vpc.vpc_id)
    }

    /// The main route table of the VPC. EC2 guarantees at most one table
    /// carries the main association, so the first answer wins; an empty
    /// answer is still a lookup failure.
    pub async fn find_main_route_table(&self, vpc_id: &str) -> Result<String, AppError> {
        let tables = self.ec2.main_route_tables(vpc_id).await?;
        let count = tables.len();
        let table = tables.into_iter().next().ok_or_else(|| AppError::Lookup {
            what: format!("main route table for VPC '{vpc_id}'"),
            count,
        })?;
        tracing::info!(
            "[nat] main route table of {vpc_id} is {}",
            table.route_table_id
        );
        Ok(table.route_table_id)
    }

    /// The subnet of the VPC whose `Name` tag contains `nat-gateway-subnet`.
    pub async fn find_nat_subnet(&self, vpc_id: &str) -> Result<String, AppError> {
        let subnets = self.ec2.describe_subnets(vpc_id).await?;
        let matched: Vec<Subnet> = subnets
            .into_iter()
            .filter(|subnet| {
                subnet
                    .name_tag()
                    .is_some_and(|name| name.contains(NAT_SUBNET_TAG))
            })
            .collect();
        let subnet = exactly_one(
            matched,
            format!("subnet with Name tag containing '{NAT_SUBNET_TAG}' in VPC '{vpc_id}'"),
        )?;
        tracing::info!(
            "[nat] NAT gateway subnet of {vpc_id} is {}",
            subnet.subnet_id
        );
        Ok(subnet.subnet_id)
    }
}

/// Reduces a filtered result set to its single element. The error carries
/// what was searched and how many candidates were found.
pub fn exactly_one<T>(mut matches: Vec<T>, what: String) -> Result<T, AppError> {
    if matches.len() == 1 {
        Ok(matches.remove(0))
    } else {
        Err(AppError::Lookup {
            what,
            count: matches.len(),
        })
    }
}
