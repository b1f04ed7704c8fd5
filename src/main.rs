// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use clap::Parser;
use tracing_subscriber::EnvFilter;
use workspace_nat::application::Application;
use workspace_nat::configuration::NatOptions;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        // keep stdout free for the workflow result
        .with_writer(std::io::stderr)
        // remove the name of the function from every log entry
        .with_target(false)
        .init();

    let options = NatOptions::parse();

    tracing::info!("[nat] {:?}", &options);

    let application = Application::build(options).await;

    if let Err(err) = application.run().await {
        tracing::error!("[nat] {err}");
        std::process::exit(1);
    }
}
