// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::fmt;

/// A single EC2 resource tag. Entries without a key or value are dropped
/// during conversion from the provider types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vpc {
    pub vpc_id: String,
    pub tags: Vec<Tag>,
}

impl Vpc {
    /// Value of the `Name` tag, when present.
    pub fn name_tag(&self) -> Option<&str> {
        name_tag(&self.tags)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subnet {
    pub subnet_id: String,
    pub tags: Vec<Tag>,
}

impl Subnet {
    /// Value of the `Name` tag, when present.
    pub fn name_tag(&self) -> Option<&str> {
        name_tag(&self.tags)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub destination_cidr_block: Option<String>,
    pub nat_gateway_id: Option<String>,
    pub gateway_id: Option<String>,
    pub state: Option<String>,
}

impl Route {
    /// Target of the route. NAT gateway targets win over plain gateway
    /// targets when both are set.
    pub fn target(&self) -> Option<&str> {
        self.nat_gateway_id.as_deref().or(self.gateway_id.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    pub route_table_id: String,
    pub routes: Vec<Route>,
}

impl RouteTable {
    /// The route whose destination CIDR equals `destination`, when present.
    pub fn route_to(&self, destination: &str) -> Option<&Route> {
        self.routes
            .iter()
            .find(|route| route.destination_cidr_block.as_deref() == Some(destination))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NatGatewayAddress {
    pub allocation_id: Option<String>,
    pub public_ip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NatGateway {
    pub nat_gateway_id: String,
    pub state: NatGatewayState,
    pub subnet_id: String,
    pub addresses: Vec<NatGatewayAddress>,
}

/// Lifecycle states a NAT gateway moves through. States EC2 introduces
/// later surface as [`NatGatewayState::Unknown`] instead of an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NatGatewayState {
    Pending,
    Failed,
    Available,
    Deleting,
    Deleted,
    Unknown(String),
}

impl NatGatewayState {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pending" => Self::Pending,
            "failed" => Self::Failed,
            "available" => Self::Available,
            "deleting" => Self::Deleting,
            "deleted" => Self::Deleted,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Failed => "failed",
            Self::Available => "available",
            Self::Deleting => "deleting",
            Self::Deleted => "deleted",
            Self::Unknown(other) => other,
        }
    }
}

impl fmt::Display for NatGatewayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn name_tag(tags: &[Tag]) -> Option<&str> {
    tags.iter()
        .find(|tag| tag.key == "Name")
        .map(|tag| tag.value.as_str())
}

fn convert_tags(tags: &[aws_sdk_ec2::types::Tag]) -> Vec<Tag> {
    tags.iter()
        .filter_map(|tag| match (tag.key(), tag.value()) {
            (Some(key), Some(value)) => Some(Tag {
                key: key.to_string(),
                value: value.to_string(),
            }),
            _ => None,
        })
        .collect()
}

impl From<aws_sdk_ec2::types::Vpc> for Vpc {
    fn from(value: aws_sdk_ec2::types::Vpc) -> Self {
        Self {
            vpc_id: value.vpc_id().unwrap_or_default().to_string(),
            tags: convert_tags(value.tags()),
        }
    }
}

impl From<aws_sdk_ec2::types::Subnet> for Subnet {
    fn from(value: aws_sdk_ec2::types::Subnet) -> Self {
        Self {
            subnet_id: value.subnet_id().unwrap_or_default().to_string(),
            tags: convert_tags(value.tags()),
        }
    }
}

impl From<aws_sdk_ec2::types::Route> for Route {
    fn from(value: aws_sdk_ec2::types::Route) -> Self {
        Self {
            destination_cidr_block: value.destination_cidr_block().map(|s| s.to_string()),
            nat_gateway_id: value.nat_gateway_id().map(|s| s.to_string()),
            gateway_id: value.gateway_id().map(|s| s.to_string()),
            state: value.state().map(|state| state.as_str().to_string()),
        }
    }
}

impl From<aws_sdk_ec2::types::RouteTable> for RouteTable {
    fn from(value: aws_sdk_ec2::types::RouteTable) -> Self {
        Self {
            route_table_id: value.route_table_id().unwrap_or_default().to_string(),
            routes: value.routes().iter().cloned().map(Route::from).collect(),
        }
    }
}

impl From<aws_sdk_ec2::types::NatGatewayAddress> for NatGatewayAddress {
    fn from(value: aws_sdk_ec2::types::NatGatewayAddress) -> Self {
        Self {
            allocation_id: value.allocation_id().map(|s| s.to_string()),
            public_ip: value.public_ip().map(|s| s.to_string()),
        }
    }
}

impl From<aws_sdk_ec2::types::NatGateway> for NatGateway {
    fn from(value: aws_sdk_ec2::types::NatGateway) -> Self {
        Self {
            nat_gateway_id: value.nat_gateway_id().unwrap_or_default().to_string(),
            state: value
                .state()
                .map(|state| NatGatewayState::from_str(state.as_str()))
                .unwrap_or_else(|| NatGatewayState::Unknown(String::new())),
            subnet_id: value.subnet_id().unwrap_or_default().to_string(),
            addresses: value
                .nat_gateway_addresses()
                .iter()
                .cloned()
                .map(NatGatewayAddress::from)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_tag_returns_name_value() {
        let vpc = Vpc {
            vpc_id: "vpc-1".to_string(),
            tags: vec![
                Tag {
                    key: "env".to_string(),
                    value: "prod".to_string(),
                },
                Tag {
                    key: "Name".to_string(),
                    value: "databricks-workerenv-42-vpc".to_string(),
                },
            ],
        };
        assert_eq!(vpc.name_tag(), Some("databricks-workerenv-42-vpc"));
    }

    #[test]
    fn test_name_tag_missing() {
        let subnet = Subnet {
            subnet_id: "subnet-1".to_string(),
            tags: vec![Tag {
                key: "env".to_string(),
                value: "prod".to_string(),
            }],
        };
        assert_eq!(subnet.name_tag(), None);
    }

    #[test]
    fn test_nat_gateway_state_from_str() {
        assert_eq!(
            NatGatewayState::from_str("available"),
            NatGatewayState::Available
        );
        assert_eq!(
            NatGatewayState::from_str("Pending"),
            NatGatewayState::Pending
        );
        assert_eq!(
            NatGatewayState::from_str("limbo"),
            NatGatewayState::Unknown("limbo".to_string())
        );
    }

    #[test]
    fn test_nat_gateway_state_round_trip() {
        let states = [
            NatGatewayState::Pending,
            NatGatewayState::Failed,
            NatGatewayState::Available,
            NatGatewayState::Deleting,
            NatGatewayState::Deleted,
        ];
        for state in states {
            assert_eq!(NatGatewayState::from_str(state.as_str()), state);
        }
    }

    #[test]
    fn test_route_target_prefers_nat_gateway() {
        let route = Route {
            destination_cidr_block: Some("0.0.0.0/0".to_string()),
            nat_gateway_id: Some("nat-1".to_string()),
            gateway_id: Some("igw-1".to_string()),
            state: Some("active".to_string()),
        };
        assert_eq!(route.target(), Some("nat-1"));
    }

    #[test]
    fn test_route_table_route_to() {
        let table = RouteTable {
            route_table_id: "rtb-1".to_string(),
            routes: vec![
                Route {
                    destination_cidr_block: Some("10.0.0.0/16".to_string()),
                    nat_gateway_id: None,
                    gateway_id: None,
                    state: Some("active".to_string()),
                },
                Route {
                    destination_cidr_block: Some("0.0.0.0/0".to_string()),
                    nat_gateway_id: None,
                    gateway_id: Some("igw-1".to_string()),
                    state: Some("active".to_string()),
                },
            ],
        };
        let route = table.route_to("0.0.0.0/0").unwrap();
        assert_eq!(route.target(), Some("igw-1"));
        assert!(table.route_to("192.168.0.0/24").is_none());
    }

    #[test]
    fn test_vpc_from_sdk_drops_incomplete_tags() {
        let sdk_vpc = aws_sdk_ec2::types::Vpc::builder()
            .vpc_id("vpc-123")
            .tags(
                aws_sdk_ec2::types::Tag::builder()
                    .key("Name")
                    .value("databricks-workerenv-42-vpc")
                    .build(),
            )
            .tags(aws_sdk_ec2::types::Tag::builder().key("orphaned").build())
            .build();
        let vpc = Vpc::from(sdk_vpc);
        assert_eq!(vpc.vpc_id, "vpc-123");
        assert_eq!(
            vpc.tags,
            vec![Tag {
                key: "Name".to_string(),
                value: "databricks-workerenv-42-vpc".to_string(),
            }]
        );
    }

    #[test]
    fn test_nat_gateway_from_sdk() {
        let sdk_gateway = aws_sdk_ec2::types::NatGateway::builder()
            .nat_gateway_id("nat-1")
            .subnet_id("subnet-1")
            .state(aws_sdk_ec2::types::NatGatewayState::Available)
            .nat_gateway_addresses(
                aws_sdk_ec2::types::NatGatewayAddress::builder()
                    .allocation_id("eipalloc-1")
                    .public_ip("203.0.113.9")
                    .build(),
            )
            .build();
        let gateway = NatGateway::from(sdk_gateway);
        assert_eq!(gateway.nat_gateway_id, "nat-1");
        assert_eq!(gateway.state, NatGatewayState::Available);
        assert_eq!(gateway.subnet_id, "subnet-1");
        assert_eq!(gateway.addresses.len(), 1);
        assert_eq!(gateway.addresses[0].allocation_id.as_deref(), Some("eipalloc-1"));
        assert_eq!(gateway.addresses[0].public_ip.as_deref(), Some("203.0.113.9"));
    }
}
