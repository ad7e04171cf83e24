use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use covertype_engine::sweep::{self, SweepDomain};
use covertype_engine::{
    ArtifactPaths, ArtifactSource, ClassifierArtifact, ConfidenceCurve, InferenceEngine,
    PredictionResult, ProbabilitySource, SyntheticConfig, shared,
};
use covertype_features::{
    CoverType, ElevationZone, Field, InputVector, LengthAdjustment, Wilderness,
};
use covertype_forest::{MaxFeatures, SplitCriterion, Voting};

#[derive(Parser)]
#[command(name = "covertype")]
#[command(about = "Forest cover type prediction from cartographic site variables")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory holding forest_model.bin, forest_scaler.json and forest_features.json
    #[arg(long, env = "COVERTYPE_ARTIFACT_DIR", default_value = ".", global = true)]
    artifact_dir: PathBuf,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Forest parameters for the demonstration artifact.
#[derive(Args, Debug, Clone)]
struct ForestArgs {
    /// Maximum tree depth (unlimited if not set)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Features tried per split: "sqrt", "log2", "all", a count, or a fraction in (0, 1]
    #[arg(long, default_value = "sqrt")]
    max_features: String,

    /// Split criterion: "gini" or "entropy"
    #[arg(long, default_value = "gini")]
    criterion: String,

    /// Minimum samples a node needs before it may split
    #[arg(long, default_value_t = 2)]
    min_samples_split: usize,

    /// Minimum samples in each child of a split
    #[arg(long, default_value_t = 1)]
    min_samples_leaf: usize,

    /// Bootstrap sample size per tree as a fraction of the data
    #[arg(long, default_value_t = 1.0)]
    bootstrap_fraction: f64,
}

impl ForestArgs {
    fn apply(&self, recipe: SyntheticConfig) -> Result<SyntheticConfig> {
        Ok(recipe
            .with_max_depth(self.max_depth)
            .with_max_features(parse_max_features(&self.max_features)?)
            .with_criterion(parse_criterion(&self.criterion)?)
            .with_min_samples_split(self.min_samples_split)
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_bootstrap_fraction(self.bootstrap_fraction))
    }
}

/// Site measurements. Every field defaults to the reference site.
#[derive(Args, Debug, Clone)]
struct SiteArgs {
    /// Elevation in meters [1800, 3900]
    #[arg(long, default_value_t = Field::Elevation.default_value())]
    elevation: f64,

    /// Aspect in degrees azimuth [0, 360]
    #[arg(long, default_value_t = Field::Aspect.default_value())]
    aspect: f64,

    /// Slope in degrees [0, 52]
    #[arg(long, default_value_t = Field::Slope.default_value())]
    slope: f64,

    /// Horizontal distance to nearest surface water, meters [0, 1400]
    #[arg(long, default_value_t = Field::HorizontalDistanceToHydrology.default_value())]
    h_hydro: f64,

    /// Vertical distance to nearest surface water, meters [-150, 600]
    #[arg(long, default_value_t = Field::VerticalDistanceToHydrology.default_value(), allow_negative_numbers = true)]
    v_hydro: f64,

    /// Horizontal distance to nearest roadway, meters [0, 7000]
    #[arg(long, default_value_t = Field::HorizontalDistanceToRoadways.default_value())]
    h_roads: f64,

    /// Hillshade index at 9am [0, 254]
    #[arg(long, default_value_t = Field::Hillshade9am.default_value())]
    hillshade_9am: f64,

    /// Hillshade index at noon [0, 254]
    #[arg(long, default_value_t = Field::HillshadeNoon.default_value())]
    hillshade_noon: f64,

    /// Hillshade index at 3pm [0, 254]
    #[arg(long, default_value_t = Field::Hillshade3pm.default_value())]
    hillshade_3pm: f64,

    /// Horizontal distance to nearest wildfire ignition point, meters [0, 7000]
    #[arg(long, default_value_t = Field::HorizontalDistanceToFirePoints.default_value())]
    h_fire: f64,

    /// Wilderness area: rawah, neota, comanche-peak or cache-la-poudre
    #[arg(long, default_value = "rawah")]
    wilderness: Wilderness,
}

impl SiteArgs {
    fn to_input(&self) -> Result<InputVector> {
        let input = InputVector {
            elevation: self.elevation,
            aspect: self.aspect,
            slope: self.slope,
            h_hydro: self.h_hydro,
            v_hydro: self.v_hydro,
            h_roads: self.h_roads,
            hillshade_9am: self.hillshade_9am,
            hillshade_noon: self.hillshade_noon,
            hillshade_3pm: self.hillshade_3pm,
            h_fire: self.h_fire,
            wilderness: self.wilderness,
        };
        input.validate().context("invalid site input")?;
        Ok(input)
    }
}

#[derive(Subcommand)]
enum Command {
    /// Classify one site
    Classify {
        #[command(flatten)]
        site: SiteArgs,

        /// Number of most probable cover types to list
        #[arg(long, default_value_t = 3)]
        top_k: usize,
    },

    /// Vary one field across a range and classify each value
    Sweep {
        /// Field to vary, e.g. elevation, slope, h_hydro
        #[arg(long)]
        field: Field,

        /// First value (defaults to the field's minimum)
        #[arg(long, allow_negative_numbers = true)]
        start: Option<f64>,

        /// Last value (defaults to the field's maximum)
        #[arg(long, allow_negative_numbers = true)]
        stop: Option<f64>,

        /// Grid spacing (defaults to the field's sweep step)
        #[arg(long)]
        step: Option<f64>,

        #[command(flatten)]
        site: SiteArgs,
    },

    /// Elevation class scatter and sensitivity curves around one site
    Explore {
        #[command(flatten)]
        site: SiteArgs,
    },

    /// Synthesize the demonstration artifact and write it to disk
    ExportDemo {
        /// Directory to write the three artifact files into
        #[arg(long)]
        output_dir: PathBuf,

        /// Number of synthetic samples
        #[arg(long, default_value_t = 5000)]
        n_samples: usize,

        /// Number of trees in the forest
        #[arg(long, default_value_t = 50)]
        n_trees: usize,

        /// RNG seed for data generation and fitting
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Use hard (majority) voting; the model then reports no probabilities
        #[arg(long, default_value_t = false)]
        hard_voting: bool,

        #[command(flatten)]
        forest: ForestArgs,
    },

    /// Print metadata of the classifier artifact in use
    Inspect,
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct ClassifyOutput {
    cover_type: CoverType,
    name: &'static str,
    description: &'static str,
    confidence: f64,
    probability_source: ProbabilitySource,
    distribution: Vec<ClassProbability>,
    top_k: Vec<ClassProbability>,
    elevation_zone: Option<&'static str>,
    intensity: Vec<FieldIntensity>,
    adjustment: LengthAdjustment,
}

#[derive(Serialize)]
struct ClassProbability {
    cover_type: CoverType,
    name: &'static str,
    probability: f64,
}

#[derive(Serialize)]
struct FieldIntensity {
    field: Field,
    value: f64,
    normalized: f64,
}

#[derive(Serialize)]
struct SweepOutput {
    field: Field,
    base_cover_type: CoverType,
    domain: SweepDomain,
    points: Vec<SweepPointOutput>,
}

#[derive(Serialize)]
struct SweepPointOutput {
    value: f64,
    cover_type: CoverType,
    base_class_confidence: f64,
}

#[derive(Serialize)]
struct ExploreOutput {
    base_cover_type: CoverType,
    class_scatter: Vec<ScatterPoint>,
    sensitivity: Vec<ConfidenceCurve>,
}

#[derive(Serialize)]
struct ScatterPoint {
    elevation: f64,
    cover_type: CoverType,
}

#[derive(Serialize)]
struct ExportOutput {
    output_dir: PathBuf,
    n_samples: usize,
    n_trees: usize,
    n_features: usize,
    n_classes: usize,
    voting: Voting,
}

#[derive(Serialize)]
struct InspectOutput {
    artifact_dir: PathBuf,
    source: ArtifactSource,
    n_trees: usize,
    n_features: usize,
    n_classes: usize,
    voting: Voting,
    supports_probabilities: bool,
    feature_names: Vec<String>,
}

fn class_probability(result: &PredictionResult, cover_type: CoverType) -> ClassProbability {
    ClassProbability {
        cover_type,
        name: cover_type.name(),
        probability: result.probability_of(cover_type),
    }
}

fn parse_criterion(s: &str) -> Result<SplitCriterion> {
    match s {
        "gini" => Ok(SplitCriterion::Gini),
        "entropy" => Ok(SplitCriterion::Entropy),
        other => anyhow::bail!("unknown criterion: {other} (expected gini or entropy)"),
    }
}

fn parse_max_features(s: &str) -> Result<MaxFeatures> {
    match s {
        "sqrt" => Ok(MaxFeatures::Sqrt),
        "log2" => Ok(MaxFeatures::Log2),
        "all" => Ok(MaxFeatures::All),
        other => {
            if let Ok(n) = other.parse::<usize>() {
                return Ok(MaxFeatures::Fixed(n));
            }
            match other.parse::<f64>() {
                Ok(f) if f > 0.0 && f <= 1.0 => Ok(MaxFeatures::Fraction(f)),
                _ => anyhow::bail!(
                    "unknown max features: {other} (expected sqrt, log2, all, a count, or a fraction in (0, 1])"
                ),
            }
        }
    }
}

fn load_engine(artifact_dir: &Path) -> Result<&'static InferenceEngine> {
    let engine = shared(&ArtifactPaths::in_dir(artifact_dir))
        .context("failed to initialize classifier")?;
    let artifact = engine.artifact();
    info!(
        source = ?artifact.source(),
        n_trees = artifact.forest().n_trees(),
        n_features = artifact.n_features(),
        "classifier ready"
    );
    Ok(engine)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Classify { site, top_k } => {
            let input = site.to_input()?;
            let engine = load_engine(&cli.artifact_dir)?;
            let result = engine.classify_input(&input).context("classification failed")?;

            let cover = result.cover_type();
            let output = ClassifyOutput {
                cover_type: cover,
                name: cover.name(),
                description: cover.description(),
                confidence: result.confidence(),
                probability_source: result.probability_source(),
                distribution: CoverType::ALL
                    .iter()
                    .map(|&c| class_probability(&result, c))
                    .collect(),
                top_k: result
                    .top_k(top_k)
                    .into_iter()
                    .map(|(c, _)| class_probability(&result, c))
                    .collect(),
                elevation_zone: ElevationZone::for_elevation(input.elevation).map(ElevationZone::name),
                intensity: input
                    .intensity()
                    .into_iter()
                    .map(|(field, normalized)| FieldIntensity {
                        field,
                        value: input.get(field),
                        normalized,
                    })
                    .collect(),
                adjustment: result.adjustment(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Sweep {
            field,
            start,
            stop,
            step,
            site,
        } => {
            let base = site.to_input()?;
            let full = SweepDomain::full(field);
            let domain = SweepDomain::new(
                start.unwrap_or(full.start()),
                stop.unwrap_or(full.stop()),
                step.unwrap_or(full.step()),
            )
            .context("invalid sweep range")?;

            let engine = load_engine(&cli.artifact_dir)?;
            let assembler = engine.assembler();
            let base_cover = engine
                .classify_input(&base)
                .context("classification of base site failed")?
                .cover_type();

            let points = sweep::sweep(engine, &assembler, &base, field, domain)
                .map(|point| {
                    point.map(|p| SweepPointOutput {
                        value: p.value,
                        cover_type: p.prediction.cover_type(),
                        base_class_confidence: p.prediction.probability_of(base_cover),
                    })
                })
                .collect::<Result<Vec<_>, _>>()
                .context("sweep failed")?;
            info!(field = field.name(), n_points = points.len(), "sweep complete");

            let output = SweepOutput {
                field,
                base_cover_type: base_cover,
                domain,
                points,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Explore { site } => {
            let base = site.to_input()?;
            let engine = load_engine(&cli.artifact_dir)?;
            let assembler = engine.assembler();

            let base_cover = engine
                .classify_input(&base)
                .context("classification of base site failed")?
                .cover_type();
            let class_scatter = sweep::class_scatter(engine, &assembler, &base)
                .context("elevation scatter failed")?
                .into_iter()
                .map(|(elevation, cover_type)| ScatterPoint {
                    elevation,
                    cover_type,
                })
                .collect();
            let sensitivity = sweep::sensitivity_profile(engine, &assembler, &base)
                .context("sensitivity profile failed")?;

            let output = ExploreOutput {
                base_cover_type: base_cover,
                class_scatter,
                sensitivity,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::ExportDemo {
            output_dir,
            n_samples,
            n_trees,
            seed,
            hard_voting,
            forest,
        } => {
            let voting = if hard_voting { Voting::Hard } else { Voting::Soft };
            let recipe = forest.apply(
                SyntheticConfig::new(n_samples, n_trees)
                    .with_seed(seed)
                    .with_voting(voting),
            )?;
            let artifact =
                ClassifierArtifact::synthesize(&recipe).context("failed to synthesize artifact")?;
            artifact
                .save(&ArtifactPaths::in_dir(&output_dir))
                .with_context(|| format!("failed to write artifact to {}", output_dir.display()))?;

            let output = ExportOutput {
                output_dir,
                n_samples,
                n_trees: artifact.forest().n_trees(),
                n_features: artifact.n_features(),
                n_classes: artifact.forest().n_classes(),
                voting,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Inspect => {
            let engine = load_engine(&cli.artifact_dir)?;
            let artifact = engine.artifact();
            let output = InspectOutput {
                artifact_dir: cli.artifact_dir,
                source: artifact.source(),
                n_trees: artifact.forest().n_trees(),
                n_features: artifact.n_features(),
                n_classes: artifact.forest().n_classes(),
                voting: artifact.voting(),
                supports_probabilities: artifact.forest().supports_proba(),
                feature_names: artifact.feature_names().to_vec(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
