use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use qmesh::Tile;
use std::fs;

type AnyRes = anyhow::Result<()>;

/// Quantized-mesh terrain tile multitool.
#[derive(Clone, Parser)]
struct Cli {
    #[command(subcommand)]
    command: SubCmd,
}

#[derive(Clone, Subcommand)]
enum SubCmd {
    /// Build a terrain tile pyramid from an elevation raster.
    #[cfg(feature = "build")]
    Build(BuildArgs),
    /// Print the header and mesh statistics of a `.terrain` tile.
    Probe(ProbeArgs),
}

#[cfg(feature = "build")]
#[derive(Clone, Args)]
struct BuildArgs {
    /// Finest zoom level to build.
    #[clap(long, short)]
    start_zoom: u8,

    /// Coarsest zoom level to build.
    #[clap(long, short, default_value_t = 0)]
    end_zoom: u8,

    /// Fraction of triangulation edges each tile keeps after
    /// simplification.
    #[clap(long, short, default_value_t = tintile::DEFAULT_STOP_RATIO)]
    ratio: f64,

    /// Build every tile independently instead of inheriting committed
    /// borders from neighbors.
    #[clap(long)]
    no_borders: bool,

    /// Source elevation raster (any GDAL format, geographic WGS84).
    src: Utf8PathBuf,

    /// Output directory for the `{zoom}/{x}/{y}.terrain` tree.
    out: Utf8PathBuf,
}

#[derive(Clone, Args)]
struct ProbeArgs {
    /// A `.terrain` tile file.
    tile: Utf8PathBuf,
}

#[cfg(feature = "build")]
fn build(args: BuildArgs) -> AnyRes {
    use tintile::{GdalRaster, PyramidBuilder, TileBuilder};

    anyhow::ensure!(
        args.end_zoom <= args.start_zoom,
        "end zoom {} is finer than start zoom {}",
        args.end_zoom,
        args.start_zoom
    );
    anyhow::ensure!(
        (0.0..=1.0).contains(&args.ratio),
        "stop ratio must be within [0, 1]"
    );

    let raster = GdalRaster::open(args.src.as_std_path())?;
    let pyramid = PyramidBuilder::new(raster)
        .with_builder(TileBuilder::new().with_stop_ratio(args.ratio));
    let pyramid = if args.no_borders {
        pyramid.without_border_inheritance()
    } else {
        pyramid
    };

    let stats = pyramid.build(args.start_zoom, args.end_zoom, args.out.as_std_path())?;
    println!("{} tiles written, {} skipped", stats.built, stats.skipped);
    Ok(())
}

fn probe(args: ProbeArgs) -> AnyRes {
    let bytes = fs::read(args.tile.as_std_path())?;
    let tile = Tile::from_bytes(&bytes)?;

    let header = &tile.header;
    println!("heights: {} .. {} m", header.min_height, header.max_height);
    println!(
        "center: ({:.1}, {:.1}, {:.1})",
        header.center[0], header.center[1], header.center[2]
    );
    println!(
        "bounding sphere: r = {:.1} m at ({:.1}, {:.1}, {:.1})",
        header.bounding_sphere_radius,
        header.bounding_sphere_center[0],
        header.bounding_sphere_center[1],
        header.bounding_sphere_center[2]
    );
    println!(
        "horizon occlusion point: ({:.1}, {:.1}, {:.1})",
        header.horizon_occlusion_point[0],
        header.horizon_occlusion_point[1],
        header.horizon_occlusion_point[2]
    );
    println!(
        "{} vertices, {} triangles",
        tile.vertex_data.len(),
        tile.index_data.triangle_count()
    );
    println!(
        "edge vertices: west {}, south {}, east {}, north {}",
        tile.edge_indices.west.len(),
        tile.edge_indices.south.len(),
        tile.edge_indices.east.len(),
        tile.edge_indices.north.len()
    );
    Ok(())
}

fn main() -> AnyRes {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        #[cfg(feature = "build")]
        SubCmd::Build(args) => build(args),
        SubCmd::Probe(args) => probe(args),
    }
}
