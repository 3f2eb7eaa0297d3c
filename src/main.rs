use artifact_forge::config::Config;
use artifact_forge::crafter::Crafter;
use artifact_forge::dwell::DwellSampler;
use artifact_forge::fsm::Lifecycle;
use artifact_forge::log;
use artifact_forge::mesh::Mesh;
use artifact_forge::message::Resource;
use artifact_forge::role::{Profile, RoleMap};
use clap::Parser;
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = Config::parse();
    config.validate()?;

    let roles = RoleMap::assign(config.world_size(), config.producers, config.consumers);

    match config.local {
        Some(_) => run_local(&config, &roles).await,
        None => {
            let rank = config.rank.ok_or("--rank is required")?;
            let mesh = Mesh::connect(rank, &config.peers).await?;
            run_rank(rank, mesh, &config, &roles).await
        }
    }
}

async fn run_rank(
    rank: usize,
    mesh: Mesh,
    config: &Config,
    roles: &RoleMap,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    log::info(&format!("Rank {} of {} is up.", rank, mesh.size()));

    match Profile::new(rank, roles) {
        Some(profile) => {
            log::info(&format!("Rank {} joins as a {}.", rank, profile.role_name()));
            let available = match profile.input {
                Resource::Slot => config.slots,
                Resource::Artifact => config.artifacts,
            };
            let lifecycle = Lifecycle::new(DwellSampler::new(config.dwell_min, config.dwell_max));
            Crafter::new(profile, available, lifecycle, mesh).run().await
        }
        None => {
            log::info(&format!("Rank {} has no role and sits this round out.", rank));
            // stay up so the mesh keeps its shape
            std::future::pending::<()>().await;
            Ok(())
        }
    }
}

async fn run_local(
    config: &Config,
    roles: &RoleMap,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut handles = Vec::new();
    for mesh in Mesh::local(roles.size) {
        let config = config.clone();
        let roles = roles.clone();
        handles.push(tokio::spawn(async move {
            run_rank(mesh.rank(), mesh, &config, &roles).await
        }));
    }
    for handle in handles {
        handle.await??;
    }
    Ok(())
}
