//! TOML input deck.
//!
//! A deck names the run window, physical constants, the phase-space grid,
//! the species, the initial electromagnetic field and the output
//! directory. Every table is optional; missing keys take the values of
//! [`DeckConfig::default`], a two-species (electron, ion) setup with a
//! weak density perturbation and seeded field noise.
//!
//! ```toml
//! [run]
//! t_end = 20.0
//! frames = 20
//!
//! [grid.x]
//! lower = 0.0
//! upper = 12.566370614359172
//! cells = 32
//!
//! [[species]]
//! name = "elc"
//! charge = -1.0
//! mass = 1.0
//! perturbation = 0.01
//!
//! [[species]]
//! name = "ion"
//! charge = 1.0
//! mass = 25.0
//!
//! [output]
//! dir = "weibel"
//! ```

use std::f64::consts::PI;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use vlasov_core::{Field, FieldError, FieldGroup, FieldId, OperatorError};
use vlasov_engine::{
    BoundaryPass, ConfigError, Diagnostics, FrameSink, Model, Simulation, SimulationConfig,
    Species, DEFAULT_MAX_CONSECUTIVE_REJECTIONS,
};
use vlasov_io::{FileSink, IoError};
use vlasov_operator::{AdvanceContext, UpdateOperator};
use vlasov_operators::{
    component, Axis, EmPerturbation, FieldEnergy, MaxwellRusanov, MaxwellianProjection,
    MomentKind, PhaseGrid, VelocityMoment, VlasovUpwind, DEFAULT_CFL,
};

/// Name of the field energy time series.
pub const FIELD_ENERGY_SERIES: &str = "field_energy";

/// Name of the electromagnetic state member.
pub const EM_FIELD: &str = "em";

/// Errors raised while loading a deck or building a simulation from it.
#[derive(Debug, Error)]
pub enum DeckError {
    /// The deck file could not be read.
    #[error("cannot read deck {}: {source}", path.display())]
    Read {
        /// Path that was opened.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },
    /// The deck is not valid TOML or has unknown keys.
    #[error("invalid deck: {0}")]
    Parse(#[from] toml::de::Error),
    /// The deck could not be rendered as TOML.
    #[error("cannot render deck: {0}")]
    Render(#[from] toml::ser::Error),
    /// Only first-order reference operators exist.
    #[error("polynomial order {0} is not supported (only 1)")]
    UnsupportedOrder(u32),
    /// An operator or projection rejected its parameters.
    #[error("{section}: {detail}")]
    Invalid {
        /// Deck section the parameters came from.
        section: String,
        /// Builder message.
        detail: String,
    },
    /// A grid or field shape is invalid.
    #[error(transparent)]
    Field(#[from] FieldError),
    /// An initial-condition projection failed.
    #[error(transparent)]
    Operator(#[from] OperatorError),
    /// The assembled model failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The output directory could not be prepared.
    #[error(transparent)]
    Output(#[from] IoError),
}

fn invalid(section: impl Into<String>) -> impl FnOnce(String) -> DeckError {
    let section = section.into();
    move |detail| DeckError::Invalid { section, detail }
}

// ── Tables ──────────────────────────────────────────────────────

/// `[run]`: time window, output cadence and retry policy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunDeck {
    /// Start time.
    pub t_start: f64,
    /// End time.
    pub t_end: f64,
    /// Output frames after the initial one.
    pub frames: u32,
    /// First attempted step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_dt: Option<f64>,
    /// Consecutive rejections before the run aborts.
    pub max_rejections: u32,
    /// Smallest acceptable suggested step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_dt: Option<f64>,
    /// Cap on suggested steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_dt: Option<f64>,
}

impl Default for RunDeck {
    fn default() -> Self {
        Self {
            t_start: 0.0,
            t_end: 20.0,
            frames: 20,
            initial_dt: None,
            max_rejections: DEFAULT_MAX_CONSECUTIVE_REJECTIONS,
            min_dt: None,
            max_dt: None,
        }
    }
}

/// `[constants]`: physical and numerical constants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConstantsDeck {
    /// Vacuum permittivity.
    pub epsilon0: f64,
    /// Vacuum permeability.
    pub mu0: f64,
    /// Target Courant number of every operator.
    pub cfl: f64,
    /// Polynomial order of the discretization.
    pub poly_order: u32,
}

impl Default for ConstantsDeck {
    fn default() -> Self {
        Self {
            epsilon0: 1.0,
            mu0: 1.0,
            cfl: DEFAULT_CFL,
            poly_order: 1,
        }
    }
}

/// One uniform axis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AxisDeck {
    /// Lower edge.
    pub lower: f64,
    /// Upper edge.
    pub upper: f64,
    /// Cell count.
    pub cells: u32,
}

impl AxisDeck {
    fn build(&self) -> Result<Axis, FieldError> {
        Axis::new(self.lower, self.upper, self.cells)
    }
}

/// `[grid]`: one configuration axis and three velocity axes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridDeck {
    /// Configuration space.
    pub x: AxisDeck,
    /// Velocity, x.
    pub vx: AxisDeck,
    /// Velocity, y.
    pub vy: AxisDeck,
    /// Velocity, z.
    pub vz: AxisDeck,
}

impl Default for GridDeck {
    fn default() -> Self {
        let v = AxisDeck {
            lower: -6.0,
            upper: 6.0,
            cells: 16,
        };
        Self {
            x: AxisDeck {
                lower: 0.0,
                upper: 4.0 * PI,
                cells: 32,
            },
            vx: v,
            vy: v,
            vz: v,
        }
    }
}

/// `[[species]]`: one kinetic species.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpeciesDeck {
    /// Name of the distribution field.
    pub name: String,
    /// Charge.
    pub charge: f64,
    /// Mass.
    pub mass: f64,
    /// Background density.
    #[serde(default = "one")]
    pub density: f64,
    /// Temperature; thermal speed is `sqrt(T / m)`.
    #[serde(default = "one")]
    pub temperature: f64,
    /// Drift velocity.
    #[serde(default)]
    pub drift: [f64; 3],
    /// Relative cosine density perturbation.
    #[serde(default)]
    pub perturbation: f64,
    /// Perturbation mode over the x domain.
    #[serde(default = "first_mode")]
    pub mode: u32,
}

fn one() -> f64 {
    1.0
}

fn first_mode() -> u32 {
    1
}

/// Electromagnetic component names accepted by the deck.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum EmComponent {
    Ex,
    Ey,
    Ez,
    Bx,
    By,
    Bz,
    Phi,
    Psi,
}

impl EmComponent {
    /// Component slot in the EM field.
    pub fn index(self) -> usize {
        match self {
            Self::Ex => component::EX,
            Self::Ey => component::EY,
            Self::Ez => component::EZ,
            Self::Bx => component::BX,
            Self::By => component::BY,
            Self::Bz => component::BZ,
            Self::Phi => component::PHI,
            Self::Psi => component::PSI,
        }
    }
}

/// A uniform background value of one component.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackgroundDeck {
    /// Component.
    pub component: EmComponent,
    /// Value.
    pub value: f64,
}

/// `[field]`: initial electromagnetic field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldDeck {
    /// Seeded Gaussian noise is added to these components.
    pub noise: Vec<EmComponent>,
    /// Noise standard deviation.
    pub noise_amplitude: f64,
    /// Noise seed.
    pub seed: u64,
    /// Uniform backgrounds.
    pub background: Vec<BackgroundDeck>,
}

impl Default for FieldDeck {
    fn default() -> Self {
        Self {
            noise: vec![EmComponent::Ex, EmComponent::By],
            noise_amplitude: 1.0e-6,
            seed: 42,
            background: Vec::new(),
        }
    }
}

/// `[output]`: where and what to persist.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputDeck {
    /// Output directory, created if missing.
    pub dir: PathBuf,
    /// Write every state member each frame.
    pub persist_state: bool,
    /// Write `<species>_M0` and `<species>_M1i` each frame.
    pub moments: bool,
    /// Append the field energy series each frame.
    pub field_energy: bool,
}

impl Default for OutputDeck {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            persist_state: true,
            moments: true,
            field_energy: true,
        }
    }
}

// ── Deck ────────────────────────────────────────────────────────

/// A complete input deck.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeckConfig {
    /// `[run]`
    pub run: RunDeck,
    /// `[constants]`
    pub constants: ConstantsDeck,
    /// `[grid]`
    pub grid: GridDeck,
    /// `[field]`
    pub field: FieldDeck,
    /// `[output]`
    pub output: OutputDeck,
    /// `[[species]]`, in state order.
    pub species: Vec<SpeciesDeck>,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            run: RunDeck::default(),
            constants: ConstantsDeck::default(),
            grid: GridDeck::default(),
            field: FieldDeck::default(),
            output: OutputDeck::default(),
            species: vec![
                SpeciesDeck {
                    name: "elc".into(),
                    charge: -1.0,
                    mass: 1.0,
                    density: 1.0,
                    temperature: 1.0,
                    drift: [0.0; 3],
                    perturbation: 0.01,
                    mode: 1,
                },
                SpeciesDeck {
                    name: "ion".into(),
                    charge: 1.0,
                    mass: 25.0,
                    density: 1.0,
                    temperature: 1.0,
                    drift: [0.0; 3],
                    perturbation: 0.0,
                    mode: 1,
                },
            ],
        }
    }
}

impl DeckConfig {
    /// Read and parse a deck file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DeckError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| DeckError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse a deck from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, DeckError> {
        Ok(toml::from_str(text)?)
    }

    /// Render the deck as TOML.
    pub fn to_toml_string(&self) -> Result<String, DeckError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// The phase-space grid.
    pub fn phase_grid(&self) -> Result<PhaseGrid, DeckError> {
        let g = &self.grid;
        Ok(PhaseGrid::new(
            g.x.build()?,
            [g.vx.build()?, g.vy.build()?, g.vz.build()?],
        )?)
    }

    /// Time-loop parameters.
    pub fn simulation_config(&self) -> SimulationConfig {
        let defaults = SimulationConfig::default();
        SimulationConfig {
            t_start: self.run.t_start,
            t_end: self.run.t_end,
            n_frames: self.run.frames,
            initial_dt: self.run.initial_dt.unwrap_or(defaults.initial_dt),
            max_consecutive_rejections: self.run.max_rejections,
            min_dt: self.run.min_dt,
            max_dt: self.run.max_dt,
            epsilon0: self.constants.epsilon0,
        }
    }

    /// Assemble the model, writing frames to `sink`.
    ///
    /// Distributions are projected from each species' Maxwellian and the
    /// EM field from `[field]` before returning.
    pub fn build_model(&self, sink: Box<dyn FrameSink>) -> Result<Model, DeckError> {
        let c = &self.constants;
        if c.poly_order != 1 {
            return Err(DeckError::UnsupportedOrder(c.poly_order));
        }
        let grid = self.phase_grid()?;

        let mut fields = Vec::with_capacity(self.species.len() + 1);
        let mut species = Vec::with_capacity(self.species.len());
        for (i, sp) in self.species.iter().enumerate() {
            let section = format!("species '{}'", sp.name);
            let init = MaxwellianProjection::builder()
                .species(&sp.name)
                .grid(&grid)
                .density(sp.density)
                .drift(sp.drift)
                .temperature(sp.temperature, sp.mass)
                .perturbation(sp.perturbation)
                .mode(sp.mode)
                .build()
                .map_err(invalid(&section))?;
            let mut f = Field::zeros(sp.name.clone(), grid.distribution_shape().clone());
            project(&init, &mut f)?;
            fields.push(f);

            let kinetic = VlasovUpwind::builder()
                .species(&sp.name)
                .grid(&grid)
                .charge(sp.charge)
                .mass(sp.mass)
                .cfl(c.cfl)
                .build()
                .map_err(invalid(&section))?;
            let momentum =
                VelocityMoment::new(&grid, MomentKind::Momentum).map_err(invalid(&section))?;
            species.push(Species {
                name: sp.name.clone(),
                field: FieldId(i as u32),
                charge: sp.charge,
                kinetic: Box::new(kinetic),
                momentum: Box::new(momentum),
            });
        }

        let em = FieldId(self.species.len() as u32);
        let mut perturbation = EmPerturbation::builder()
            .grid(&grid)
            .amplitude(self.field.noise_amplitude)
            .seed(self.field.seed);
        for c in &self.field.noise {
            perturbation = perturbation.noise_on(c.index());
        }
        for b in &self.field.background {
            perturbation = perturbation.background(b.component.index(), b.value);
        }
        let perturbation = perturbation.build().map_err(invalid("field"))?;
        let mut em_field = Field::zeros(EM_FIELD, grid.em_shape().clone());
        project(&perturbation, &mut em_field)?;
        fields.push(em_field);

        let maxwell = MaxwellRusanov::builder()
            .grid(&grid)
            .epsilon0(c.epsilon0)
            .mu0(c.mu0)
            .cfl(c.cfl)
            .build()
            .map_err(invalid("constants"))?;

        let state = FieldGroup::new(fields)?;
        let diagnostics = self.diagnostics(&grid, em, sink)?;
        Ok(Model {
            boundary: BoundaryPass::periodic_all(&state),
            state,
            em,
            maxwell: Box::new(maxwell),
            species,
            diagnostics,
        })
    }

    fn diagnostics(
        &self,
        grid: &PhaseGrid,
        em: FieldId,
        sink: Box<dyn FrameSink>,
    ) -> Result<Diagnostics, DeckError> {
        let out = &self.output;
        let mut diagnostics = Diagnostics::new(sink).persist_state(out.persist_state);
        if out.moments {
            for (i, sp) in self.species.iter().enumerate() {
                for kind in [MomentKind::Density, MomentKind::Momentum] {
                    let op = VelocityMoment::new(grid, kind).map_err(invalid("output"))?;
                    let shape = op.output_shape().clone();
                    diagnostics = diagnostics.with_field(
                        format!("{}_{}", sp.name, kind.tag()),
                        FieldId(i as u32),
                        Box::new(op),
                        shape,
                    );
                }
            }
        }
        if out.field_energy {
            let op = FieldEnergy::new(grid, self.constants.epsilon0, self.constants.mu0)
                .map_err(invalid("output"))?;
            let shape = op.output_shape().clone();
            diagnostics = diagnostics.with_series(FIELD_ENERGY_SERIES, em, Box::new(op), shape);
        }
        Ok(diagnostics)
    }

    /// Build a simulation that writes into `[output] dir`.
    pub fn build(&self) -> Result<Simulation, DeckError> {
        let sink = FileSink::new(&self.output.dir)?;
        let model = self.build_model(Box::new(sink))?;
        let sim = Simulation::new(self.simulation_config(), model)?;
        info!(
            species = self.species.len(),
            cells = self.grid.x.cells,
            output = %self.output.dir.display(),
            "deck loaded"
        );
        Ok(sim)
    }
}

/// Run a projection with no inputs into `out`.
fn project(op: &dyn UpdateOperator, out: &mut Field) -> Result<(), OperatorError> {
    let mut outputs = [out];
    let mut ctx = AdvanceContext::new(op.name(), 0.0, 0.0, &[], &mut outputs);
    op.advance(&mut ctx).map(|_| ())
}
