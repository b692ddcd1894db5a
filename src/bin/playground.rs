use anyhow::Result;
use clap::{Parser, Subcommand};
use gpulab::{Demo, EngineConfig, PlaygroundConfig};

#[derive(Parser)]
#[command(name = "playground", about = "Scene and object rendering playground")]
struct Cli {
    /// Initial camera position
    #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], default_values_t = [0.0, 0.0, 7.0])]
    camera: Vec<f32>,

    /// Samples per pixel; 1 disables multisampling
    #[arg(long, default_value_t = 4)]
    samples: u32,

    #[command(subcommand)]
    demo: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// A textured plane driven by time, pointer and viewport size
    Planes {
        /// Image under ./assets
        #[arg(default_value = "images/marlene.png")]
        image: String,
    },
    /// Randomly placed cubes tweening back and forth
    Cubes {
        #[arg(long, default_value_t = 1000)]
        count: usize,
    },
    /// Two pixel grids, one painted from an image
    Grids,
    /// A glTF model
    Model {
        /// .gltf or .glb file under ./assets
        url: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let demo = match cli.demo {
        None => PlaygroundConfig::default().demo,
        Some(Commands::Planes { image }) => Demo::Planes { image },
        Some(Commands::Cubes { count }) => Demo::Cubes { count },
        Some(Commands::Grids) => Demo::default_grids(),
        Some(Commands::Model { url }) => Demo::Model { url },
    };
    let camera_position = match cli.camera.as_slice() {
        &[x, y, z] => [x, y, z],
        _ => anyhow::bail!("--camera takes exactly three values"),
    };

    gpulab::run(PlaygroundConfig {
        camera_position,
        demo,
        engine: EngineConfig {
            sample_count: cli.samples,
            ..Default::default()
        },
        ..Default::default()
    })
}
