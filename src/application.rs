// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use crate::configuration::{NatCommand, NatOptions};
use crate::creator::NatGatewayCreator;
use crate::deleter::NatGatewayDeleter;
use crate::ec2::Ec2Manager;
use crate::errors::AppError;
use crate::locator::ResourceLocator;

/// Wires the parsed options to an EC2 client and the chosen workflow.
pub struct Application {
    options: NatOptions,
    ec2: Ec2Manager,
}

impl Application {
    pub async fn build(options: NatOptions) -> Self {
        let ec2 = Ec2Manager::connect(options.profile.as_deref(), options.region.as_deref()).await;
        Self { options, ec2 }
    }

    /// Resolves the workspace network, then runs the requested workflow.
    #[tracing::instrument(skip(self))]
    pub async fn run(&self) -> Result<(), AppError> {
        let workspace_id = &self.options.workspace_id;
        let locator = ResourceLocator::new(&self.ec2);
        let network = locator.discover(workspace_id).await?;
        match self.options.command {
            NatCommand::Create => {
                tracing::info!("[nat] creating NAT gateway for workspace {workspace_id}");
                let creator = NatGatewayCreator::new(&self.ec2, &network);
                let nat_gateway_id = creator.run().await?;
                println!("NAT gateway created with id: {nat_gateway_id}");
                Ok(())
            }
            NatCommand::Delete => {
                tracing::info!("[nat] deleting NAT gateway for workspace {workspace_id}");
                let deleter = NatGatewayDeleter::locate(&self.ec2, &network).await?;
                deleter.run().await
            }
        }
    }
}
