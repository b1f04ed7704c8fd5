// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Thin layer over the EC2 control plane.
//!
//! Every call the workflows make goes through the [`Ec2Api`] trait so the
//! lookup and lifecycle logic can be driven against an in-memory fake in
//! tests. [`Ec2Manager`] is the implementation backed by the AWS SDK.
//!
//! | Method                   | EC2 action           |
//! |--------------------------|----------------------|
//! | `describe_vpcs`          | DescribeVpcs         |
//! | `describe_subnets`       | DescribeSubnets      |
//! | `main_route_tables`      | DescribeRouteTables  |
//! | `describe_route_table`   | DescribeRouteTables  |
//! | `describe_nat_gateways`  | DescribeNatGateways  |
//! | `describe_nat_gateway`   | DescribeNatGateways  |
//! | `allocate_address`       | AllocateAddress      |
//! | `release_address`        | ReleaseAddress       |
//! | `create_nat_gateway`     | CreateNatGateway     |
//! | `delete_nat_gateway`     | DeleteNatGateway     |
//! | `create_route`           | CreateRoute          |
//! | `delete_route`           | DeleteRoute          |

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_ec2::Client;
use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_ec2::types::{DomainType, Filter};

use crate::constants::{NAT_GATEWAY_NOT_FOUND, ROUTE_NOT_FOUND};
use crate::errors::AppError;
use crate::models::{NatGateway, RouteTable, Subnet, Vpc};

#[async_trait]
pub trait Ec2Api: Send + Sync {
    /// All VPCs visible to the caller.
    async fn describe_vpcs(&self) -> Result<Vec<Vpc>, AppError>;

    /// All subnets of the given VPC.
    async fn describe_subnets(&self, vpc_id: &str) -> Result<Vec<Subnet>, AppError>;

    /// Route tables of the given VPC that carry the main association.
    async fn main_route_tables(&self, vpc_id: &str) -> Result<Vec<RouteTable>, AppError>;

    /// A single route table by id. A missing table is a provider error.
    async fn describe_route_table(&self, route_table_id: &str) -> Result<RouteTable, AppError>;

    /// All NAT gateways visible to the caller, in every lifecycle state.
    async fn describe_nat_gateways(&self) -> Result<Vec<NatGateway>, AppError>;

    /// A single NAT gateway by id. Returns `Ok(None)` when EC2 reports
    /// `NatGatewayNotFound`, which is how long deleted gateways answer.
    async fn describe_nat_gateway(
        &self,
        nat_gateway_id: &str,
    ) -> Result<Option<NatGateway>, AppError>;

    /// Allocates a VPC-domain Elastic IP. Returns the allocation id and
    /// the public IP when the response carries one.
    async fn allocate_address(&self) -> Result<(String, Option<String>), AppError>;

    /// Releases an Elastic IP allocation.
    async fn release_address(&self, allocation_id: &str) -> Result<(), AppError>;

    /// Creates a NAT gateway in the subnet, backed by the allocation.
    /// Returns the new gateway id.
    async fn create_nat_gateway(
        &self,
        subnet_id: &str,
        allocation_id: &str,
    ) -> Result<String, AppError>;

    /// Requests deletion of a NAT gateway. Deletion is asynchronous on the
    /// EC2 side; callers poll [`Ec2Api::describe_nat_gateway`] to confirm.
    async fn delete_nat_gateway(&self, nat_gateway_id: &str) -> Result<(), AppError>;

    /// Adds a route targeting a NAT gateway. Fails unless EC2 confirms
    /// the route was created.
    async fn create_route(
        &self,
        route_table_id: &str,
        destination_cidr: &str,
        nat_gateway_id: &str,
    ) -> Result<(), AppError>;

    /// Deletes a route by destination. Returns `Ok(false)` when EC2
    /// reports `InvalidRoute.NotFound` instead of failing.
    async fn delete_route(
        &self,
        route_table_id: &str,
        destination_cidr: &str,
    ) -> Result<bool, AppError>;
}

/// [`Ec2Api`] implementation backed by the AWS SDK client.
pub struct Ec2Manager {
    client: Client,
}

impl Ec2Manager {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }

    /// Loads the shared AWS configuration and builds a client from it.
    /// Without overrides the profile and region come from the usual chain
    /// of environment variables, config files and instance metadata.
    pub async fn connect(profile: Option<&str>, region: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(profile) = profile {
            loader = loader.profile_name(profile);
        }
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }
        Self::new(&loader.load().await)
    }
}

#[async_trait]
impl Ec2Api for Ec2Manager {
    async fn describe_vpcs(&self) -> Result<Vec<Vpc>, AppError> {
        let output = self
            .client
            .describe_vpcs()
            .send()
            .await
            .map_err(|err| provider_error("DescribeVpcs", err))?;
        Ok(output.vpcs().iter().cloned().map(Vpc::from).collect())
    }

    async fn describe_subnets(&self, vpc_id: &str) -> Result<Vec<Subnet>, AppError> {
        let output = self
            .client
            .describe_subnets()
            .filters(Filter::builder().name("vpc-id").values(vpc_id).build())
            .send()
            .await
            .map_err(|err| provider_error("DescribeSubnets", err))?;
        Ok(output.subnets().iter().cloned().map(Subnet::from).collect())
    }

    async fn main_route_tables(&self, vpc_id: &str) -> Result<Vec<RouteTable>, AppError> {
        let output = self
            .client
            .describe_route_tables()
            .filters(Filter::builder().name("vpc-id").values(vpc_id).build())
            .filters(
                Filter::builder()
                    .name("association.main")
                    .values("true")
                    .build(),
            )
            .send()
            .await
            .map_err(|err| provider_error("DescribeRouteTables", err))?;
        Ok(output
            .route_tables()
            .iter()
            .cloned()
            .map(RouteTable::from)
            .collect())
    }

    async fn describe_route_table(&self, route_table_id: &str) -> Result<RouteTable, AppError> {
        let output = self
            .client
            .describe_route_tables()
            .route_table_ids(route_table_id)
            .send()
            .await
            .map_err(|err| provider_error("DescribeRouteTables", err))?;
        output
            .route_tables()
            .first()
            .cloned()
            .map(RouteTable::from)
            .ok_or_else(|| {
                AppError::Provider(format!(
                    "DescribeRouteTables returned no entry for '{route_table_id}'"
                ))
            })
    }

    async fn describe_nat_gateways(&self) -> Result<Vec<NatGateway>, AppError> {
        let output = self
            .client
            .describe_nat_gateways()
            .send()
            .await
            .map_err(|err| provider_error("DescribeNatGateways", err))?;
        Ok(output
            .nat_gateways()
            .iter()
            .cloned()
            .map(NatGateway::from)
            .collect())
    }

    async fn describe_nat_gateway(
        &self,
        nat_gateway_id: &str,
    ) -> Result<Option<NatGateway>, AppError> {
        match self
            .client
            .describe_nat_gateways()
            .nat_gateway_ids(nat_gateway_id)
            .send()
            .await
        {
            Ok(output) => Ok(output.nat_gateways().first().cloned().map(NatGateway::from)),
            Err(err) if service_error_code(&err) == Some(NAT_GATEWAY_NOT_FOUND) => Ok(None),
            Err(err) => Err(provider_error("DescribeNatGateways", err)),
        }
    }

    async fn allocate_address(&self) -> Result<(String, Option<String>), AppError> {
        let output = self
            .client
            .allocate_address()
            .domain(DomainType::Vpc)
            .send()
            .await
            .map_err(|err| provider_error("AllocateAddress", err))?;
        let allocation_id = output
            .allocation_id()
            .ok_or_else(|| {
                AppError::Provider("AllocateAddress returned no allocation id".to_string())
            })?
            .to_string();
        Ok((allocation_id, output.public_ip().map(|ip| ip.to_string())))
    }

    async fn release_address(&self, allocation_id: &str) -> Result<(), AppError> {
        self.client
            .release_address()
            .allocation_id(allocation_id)
            .send()
            .await
            .map_err(|err| provider_error("ReleaseAddress", err))?;
        Ok(())
    }

    async fn create_nat_gateway(
        &self,
        subnet_id: &str,
        allocation_id: &str,
    ) -> Result<String, AppError> {
        let output = self
            .client
            .create_nat_gateway()
            .subnet_id(subnet_id)
            .allocation_id(allocation_id)
            .send()
            .await
            .map_err(|err| provider_error("CreateNatGateway", err))?;
        output
            .nat_gateway()
            .and_then(|gateway| gateway.nat_gateway_id())
            .map(|id| id.to_string())
            .ok_or_else(|| {
                AppError::Provider("CreateNatGateway returned no gateway id".to_string())
            })
    }

    async fn delete_nat_gateway(&self, nat_gateway_id: &str) -> Result<(), AppError> {
        self.client
            .delete_nat_gateway()
            .nat_gateway_id(nat_gateway_id)
            .send()
            .await
            .map_err(|err| provider_error("DeleteNatGateway", err))?;
        Ok(())
    }

    async fn create_route(
        &self,
        route_table_id: &str,
        destination_cidr: &str,
        nat_gateway_id: &str,
    ) -> Result<(), AppError> {
        let output = self
            .client
            .create_route()
            .route_table_id(route_table_id)
            .destination_cidr_block(destination_cidr)
            .nat_gateway_id(nat_gateway_id)
            .send()
            .await
            .map_err(|err| provider_error("CreateRoute", err))?;
        if output.r#return() == Some(true) {
            Ok(())
        } else {
            Err(AppError::Provider(format!(
                "CreateRoute for {destination_cidr} on '{route_table_id}' did not return success"
            )))
        }
    }

    async fn delete_route(
        &self,
        route_table_id: &str,
        destination_cidr: &str,
    ) -> Result<bool, AppError> {
        match self
            .client
            .delete_route()
            .route_table_id(route_table_id)
            .destination_cidr_block(destination_cidr)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) if service_error_code(&err) == Some(ROUTE_NOT_FOUND) => Ok(false),
            Err(err) => Err(provider_error("DeleteRoute", err)),
        }
    }
}

/// The EC2 error code of a failed call, when the failure came from the
/// service rather than the transport.
fn service_error_code<E, R>(err: &SdkError<E, R>) -> Option<&str>
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    err.as_service_error().and_then(|service| service.code())
}

fn provider_error<E>(action: &str, source: E) -> AppError
where
    E: std::error::Error,
{
    AppError::Provider(format!("{action} failed: {}", DisplayErrorContext(source)))
}
