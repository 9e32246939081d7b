//! Asset loading with a persistent arena and scratch temporaries.
//!
//! Demonstrates: a long-lived arena for loaded meshes → per-asset scratch
//! for decode buffers → nested scratch with exclusion → level unload via
//! rewind.
//!
//! Run with `RUST_LOG=strata_arena=debug` to see commits and rewinds.

use strata::prelude::*;
use strata::types::size::{gib, kib};

#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
struct Vertex {
    pos: [f32; 3],
    normal: [f32; 3],
}

/// A fake asset: `count` vertices on a ring of radius `radius`.
struct AssetSource {
    name: &'static str,
    count: usize,
    radius: f32,
}

/// Decode `source` into `level`, using scratch space for the staging copy.
fn load_mesh(level: &mut Arena, source: &AssetSource) -> Result<Allocation, ArenaError> {
    let level_id = level.id();
    let staged = with_scratch(&[level_id], |scratch| -> Result<Vec<u8>, ArenaError> {
        let staging_id = scratch.arena_id();
        let raw = scratch.push_array::<Vertex>(source.count, PushFlags::NO_ZERO)?;
        let mut staging = scratch.arena();
        let verts = staging.slice_mut::<Vertex>(&raw)?;
        for (i, v) in verts.iter_mut().enumerate() {
            let t = i as f32 / source.count as f32 * std::f32::consts::TAU;
            v.pos = [source.radius * t.cos(), 0.0, source.radius * t.sin()];
            v.normal = [t.cos(), 0.0, t.sin()];
        }

        // Normalisation pass needs its own temporaries; keep them out of
        // the staging arena so the staged vertices survive.
        let max_len = with_scratch(&[level_id, staging_id], |tmp| {
            let lens = tmp.push_array::<f32>(source.count, PushFlags::NONE)?;
            let mut tmp = tmp.arena();
            let lens = tmp.slice_mut::<f32>(&lens)?;
            for (len, v) in lens.iter_mut().zip(verts.iter()) {
                *len = v.pos.iter().map(|c| c * c).sum::<f32>().sqrt();
            }
            Ok::<_, ArenaError>(lens.iter().copied().fold(0.0, f32::max))
        })??;
        tracing::debug!(asset = source.name, max_len, "normalised");

        Ok(bytemuck::cast_slice(verts).to_vec())
    })??;

    let mesh = level.push_copy(&staged, std::mem::align_of::<Vertex>(), PushFlags::NONE)?;
    tracing::info!(
        asset = source.name,
        vertices = source.count,
        offset = mesh.offset(),
        committed = level.committed(),
        "loaded mesh"
    );
    Ok(mesh)
}

fn main() -> Result<(), ArenaError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ArenaConfig::new(gib(1)).with_commit_size(kib(256));
    let mut level = Arena::with_config(config, strata::os::system())?;
    println!(
        "level arena: mode={} limit={} commit_size={}",
        level.mode(),
        level.limit(),
        level.commit_size()
    );

    let sources = [
        AssetSource {
            name: "rock",
            count: 2_000,
            radius: 1.0,
        },
        AssetSource {
            name: "tree",
            count: 40_000,
            radius: 3.5,
        },
        AssetSource {
            name: "castle",
            count: 250_000,
            radius: 40.0,
        },
    ];

    for round in 0..2 {
        let before = level.offset();
        let mut meshes = Vec::new();
        for source in &sources {
            meshes.push(load_mesh(&mut level, source)?);
        }
        let first = level.slice::<Vertex>(&meshes[0])?[0];
        println!(
            "round {round}: {} meshes, {} bytes used, {} committed, first vertex {:?}",
            meshes.len(),
            level.used(),
            level.committed(),
            first.pos
        );

        // Unload the level.
        level.pop_to(before);
        println!("round {round}: unloaded, {} committed", level.committed());
    }

    level.release();
    Ok(())
}
