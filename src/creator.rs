// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Provisions a NAT gateway for a workspace and routes its traffic
//! through it.
//!
//! [`NatGatewayCreator::run`] walks four steps against the network a
//! [`ResourceLocator`](crate::locator::ResourceLocator) resolved:
//!
//! 1. Allocate a VPC-domain Elastic IP.
//! 2. Create the NAT gateway in the workspace's NAT subnet, backed by
//!    that allocation.
//! 3. Poll until EC2 reports the gateway `available`. The wait is
//!    bounded; a gateway that settles in any other state aborts at once.
//! 4. Point the main route table's `0.0.0.0/0` route at the gateway,
//!    deleting the previous default route first.
//!
//! Every failure is fatal and resources created by earlier steps are
//! left in place for the operator to inspect or delete.

use tokio::time::Instant;

use crate::constants::{
    DEFAULT_ROUTE_CIDR, GATEWAY_AVAILABLE_POLL_INTERVAL, GATEWAY_AVAILABLE_TIMEOUT,
};
use crate::ec2::Ec2Api;
use crate::errors::AppError;
use crate::locator::WorkspaceNetwork;
use crate::models::NatGatewayState;

pub struct NatGatewayCreator<'a> {
    ec2: &'a dyn Ec2Api,
    network: &'a WorkspaceNetwork,
}

impl<'a> NatGatewayCreator<'a> {
    pub fn new(ec2: &'a dyn Ec2Api, network: &'a WorkspaceNetwork) -> Self {
        Self { ec2, network }
    }

    /// Runs the full workflow and returns the id of the new gateway.
    #[tracing::instrument(skip(self))]
    pub async fn run(&self) -> Result<String, AppError> {
        let allocation_id = self.allocate_elastic_ip().await?;
        let nat_gateway_id = self.create_nat_gateway(&allocation_id).await?;
        self.await_available(&nat_gateway_id).await?;
        self.rewrite_default_route(&nat_gateway_id).await?;
        Ok(nat_gateway_id)
    }

    /// Allocates the Elastic IP the gateway will use.
    #[tracing::instrument(skip(self))]
    pub async fn allocate_elastic_ip(&self) -> Result<String, AppError> {
        let (allocation_id, public_ip) = self.ec2.allocate_address().await?;
        match public_ip {
            Some(ip) => tracing::info!("[nat] allocated Elastic IP {allocation_id} ({ip})"),
            None => tracing::info!("[nat] allocated Elastic IP {allocation_id}"),
        }
        Ok(allocation_id)
    }

    /// Creates the gateway in the workspace's NAT subnet.
    #[tracing::instrument(skip(self))]
    pub async fn create_nat_gateway(&self, allocation_id: &str) -> Result<String, AppError> {
        let nat_gateway_id = self
            .ec2
            .create_nat_gateway(&self.network.nat_subnet_id, allocation_id)
            .await?;
        tracing::info!(
            "[nat] created NAT gateway {nat_gateway_id} in subnet {}",
            self.network.nat_subnet_id
        );
        Ok(nat_gateway_id)
    }

    /// Polls the gateway until it is `available`.
    ///
    /// # Errors
    ///
    /// [`AppError::UnexpectedState`] when the gateway settles in a state
    /// other than `pending` or `available`, [`AppError::WaitTimeout`]
    /// when it is still pending after [`GATEWAY_AVAILABLE_TIMEOUT`].
    #[tracing::instrument(skip(self))]
    pub async fn await_available(&self, nat_gateway_id: &str) -> Result<(), AppError> {
        let started = Instant::now();
        loop {
            let gateway = self
                .ec2
                .describe_nat_gateway(nat_gateway_id)
                .await?
                .ok_or_else(|| {
                    AppError::Provider(format!(
                        "NAT gateway {nat_gateway_id} disappeared while waiting for it to become available"
                    ))
                })?;
            match gateway.state {
                NatGatewayState::Available => {
                    tracing::info!("[nat] NAT gateway {nat_gateway_id} is available");
                    return Ok(());
                }
                NatGatewayState::Pending => {
                    tracing::info!("[nat] NAT gateway {nat_gateway_id} is still pending, waiting");
                }
                other => {
                    return Err(AppError::UnexpectedState {
                        nat_gateway_id: nat_gateway_id.to_string(),
                        state: other.as_str().to_string(),
                    });
                }
            }
            if started.elapsed() >= GATEWAY_AVAILABLE_TIMEOUT {
                return Err(AppError::WaitTimeout {
                    what: format!("NAT gateway {nat_gateway_id} to become available"),
                    waited: started.elapsed(),
                });
            }
            tokio::time::sleep(GATEWAY_AVAILABLE_POLL_INTERVAL).await;
        }
    }

    /// Replaces the default route of the main route table with one
    /// targeting the gateway. A missing previous route is fine; any
    /// other failure while deleting it aborts the workflow.
    #[tracing::instrument(skip(self))]
    pub async fn rewrite_default_route(&self, nat_gateway_id: &str) -> Result<(), AppError> {
        let route_table_id = &self.network.route_table_id;
        let deleted = self
            .ec2
            .delete_route(route_table_id, DEFAULT_ROUTE_CIDR)
            .await?;
        if deleted {
            tracing::info!(
                "[nat] deleted existing {DEFAULT_ROUTE_CIDR} route from route table {route_table_id}"
            );
        } else {
            tracing::info!(
                "[nat] no existing {DEFAULT_ROUTE_CIDR} route in route table {route_table_id}"
            );
        }
        self.ec2
            .create_route(route_table_id, DEFAULT_ROUTE_CIDR, nat_gateway_id)
            .await?;
        tracing::info!(
            "[nat] route table {route_table_id} now sends {DEFAULT_ROUTE_CIDR} through {nat_gateway_id}"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NatGateway, RouteTable, Subnet, Vpc};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedCloud {
        gateway_states: Mutex<VecDeque<NatGatewayState>>,
        gateway_missing: bool,
        route_present: bool,
        fail_delete_route: bool,
        calls: Mutex<Vec<String>>,
    }

    fn scripted(states: &[NatGatewayState]) -> ScriptedCloud {
        ScriptedCloud {
            gateway_states: Mutex::new(states.iter().cloned().collect()),
            gateway_missing: false,
            route_present: false,
            fail_delete_route: false,
            calls: Mutex::new(vec![]),
        }
    }

    impl ScriptedCloud {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn describe_count(&self) -> usize {
            self.calls()
                .iter()
                .filter(|call| call.as_str() == "DescribeNatGateways")
                .count()
        }
    }

    #[async_trait]
    impl Ec2Api for ScriptedCloud {
        async fn describe_vpcs(&self) -> Result<Vec<Vpc>, AppError> {
            unimplemented!()
        }

        async fn describe_subnets(&self, _: &str) -> Result<Vec<Subnet>, AppError> {
            unimplemented!()
        }

        async fn main_route_tables(&self, _: &str) -> Result<Vec<RouteTable>, AppError> {
            unimplemented!()
        }

        async fn describe_route_table(&self, _: &str) -> Result<RouteTable, AppError> {
            unimplemented!()
        }

        async fn describe_nat_gateways(&self) -> Result<Vec<NatGateway>, AppError> {
            unimplemented!()
        }

        async fn describe_nat_gateway(&self, _: &str) -> Result<Option<NatGateway>, AppError> {
            self.calls
                .lock()
                .unwrap()
                .push("DescribeNatGateways".to_string());
            if self.gateway_missing {
                return Ok(None);
            }
            let mut states = self.gateway_states.lock().unwrap();
            // the last scripted state repeats so perpetual pending is easy to express
            let state = if states.len() > 1 {
                states.pop_front().unwrap()
            } else {
                states.front().cloned().unwrap()
            };
            Ok(Some(NatGateway {
                nat_gateway_id: "nat-1".to_string(),
                state,
                subnet_id: "subnet-1".to_string(),
                addresses: vec![],
            }))
        }

        async fn allocate_address(&self) -> Result<(String, Option<String>), AppError> {
            self.calls
                .lock()
                .unwrap()
                .push("AllocateAddress".to_string());
            Ok(("eipalloc-1".to_string(), Some("203.0.113.9".to_string())))
        }

        async fn release_address(&self, _: &str) -> Result<(), AppError> {
            unimplemented!()
        }

        async fn create_nat_gateway(&self, _: &str, _: &str) -> Result<String, AppError> {
            self.calls
                .lock()
                .unwrap()
                .push("CreateNatGateway".to_string());
            Ok("nat-1".to_string())
        }

        async fn delete_nat_gateway(&self, _: &str) -> Result<(), AppError> {
            unimplemented!()
        }

        async fn create_route(&self, _: &str, _: &str, _: &str) -> Result<(), AppError> {
            self.calls.lock().unwrap().push("CreateRoute".to_string());
            Ok(())
        }

        async fn delete_route(&self, _: &str, _: &str) -> Result<bool, AppError> {
            self.calls.lock().unwrap().push("DeleteRoute".to_string());
            if self.fail_delete_route {
                return Err(AppError::Provider("DeleteRoute failed: simulated".to_string()));
            }
            Ok(self.route_present)
        }
    }

    fn network() -> WorkspaceNetwork {
        WorkspaceNetwork {
            vpc_id: "vpc-1".to_string(),
            route_table_id: "rtb-1".to_string(),
            nat_subnet_id: "subnet-1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_run_executes_steps_in_order() {
        let cloud = scripted(&[NatGatewayState::Available]);
        let network = network();
        let creator = NatGatewayCreator::new(&cloud, &network);
        assert_eq!(creator.run().await.unwrap(), "nat-1");
        assert_eq!(
            cloud.calls(),
            vec![
                "AllocateAddress",
                "CreateNatGateway",
                "DescribeNatGateways",
                "DeleteRoute",
                "CreateRoute",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_available_waits_through_pending() {
        let cloud = scripted(&[
            NatGatewayState::Pending,
            NatGatewayState::Pending,
            NatGatewayState::Available,
        ]);
        let network = network();
        let creator = NatGatewayCreator::new(&cloud, &network);
        creator.await_available("nat-1").await.unwrap();
        assert_eq!(cloud.describe_count(), 3);
    }

    #[tokio::test]
    async fn test_await_available_rejects_failed_gateway() {
        let cloud = scripted(&[NatGatewayState::Failed]);
        let network = network();
        let creator = NatGatewayCreator::new(&cloud, &network);
        let err = creator.await_available("nat-1").await.unwrap_err();
        assert_eq!(
            err,
            AppError::UnexpectedState {
                nat_gateway_id: "nat-1".to_string(),
                state: "failed".to_string(),
            }
        );
        assert_eq!(cloud.describe_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_available_times_out_on_perpetual_pending() {
        let cloud = scripted(&[NatGatewayState::Pending]);
        let network = network();
        let creator = NatGatewayCreator::new(&cloud, &network);
        let err = creator.await_available("nat-1").await.unwrap_err();
        assert!(matches!(err, AppError::WaitTimeout { .. }));
        // polled every 30s over a 10 minute budget
        assert_eq!(cloud.describe_count(), 21);
    }

    #[tokio::test]
    async fn test_await_available_fails_when_gateway_vanishes() {
        let mut cloud = scripted(&[]);
        cloud.gateway_missing = true;
        let network = network();
        let creator = NatGatewayCreator::new(&cloud, &network);
        let err = creator.await_available("nat-1").await.unwrap_err();
        assert!(matches!(err, AppError::Provider(_)));
    }

    #[tokio::test]
    async fn test_rewrite_default_route_replaces_existing_route() {
        let mut cloud = scripted(&[]);
        cloud.route_present = true;
        let network = network();
        let creator = NatGatewayCreator::new(&cloud, &network);
        creator.rewrite_default_route("nat-1").await.unwrap();
        assert_eq!(cloud.calls(), vec!["DeleteRoute", "CreateRoute"]);
    }

    #[tokio::test]
    async fn test_rewrite_default_route_without_existing_route() {
        let cloud = scripted(&[]);
        let network = network();
        let creator = NatGatewayCreator::new(&cloud, &network);
        creator.rewrite_default_route("nat-1").await.unwrap();
        assert_eq!(cloud.calls(), vec!["DeleteRoute", "CreateRoute"]);
    }

    #[tokio::test]
    async fn test_rewrite_default_route_propagates_delete_failure() {
        let mut cloud = scripted(&[]);
        cloud.fail_delete_route = true;
        let network = network();
        let creator = NatGatewayCreator::new(&cloud, &network);
        let err = creator.rewrite_default_route("nat-1").await.unwrap_err();
        assert!(matches!(err, AppError::Provider(_)));
        assert_eq!(cloud.calls(), vec!["DeleteRoute"]);
    }
}
