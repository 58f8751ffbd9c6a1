use half::{bf16, f16};

/// Where model inference runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Device {
    /// Host CPU.
    #[default]
    Cpu,
    /// GPU or other accelerator owned by the model runtime.
    Accelerator,
}

/// Numeric precision used for per-frame model computation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Precision {
    /// Plain `f32`.
    #[default]
    Full,
    /// IEEE half precision.
    Half,
    /// bfloat16.
    BFloat16,
}

impl Precision {
    /// Reduced precision type for `device`: bfloat16 on CPU, half elsewhere.
    pub fn reduced_for(device: Device) -> Self {
        match device {
            Device::Cpu => Self::BFloat16,
            Device::Accelerator => Self::Half,
        }
    }

    /// Round `v` to what this precision can represent.
    pub fn round(self, v: f32) -> f32 {
        match self {
            Self::Full => v,
            Self::Half => f16::from_f32(v).to_f32(),
            Self::BFloat16 => bf16::from_f32(v).to_f32(),
        }
    }

    /// [`Precision::round`] for `f64` coordinates.
    pub fn round_f64(self, v: f64) -> f64 {
        match self {
            Self::Full => v,
            _ => f64::from(self.round(v as f32)),
        }
    }
}

/// Inference-only computation context handed to every model call.
///
/// Models never receive gradients or mutate their parameters through this context; it only
/// selects the device and the numeric precision of the per-frame work.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InferenceContext {
    /// Device the models were loaded on.
    pub device: Device,
    /// Precision for per-frame computation.
    pub precision: Precision,
}

impl InferenceContext {
    /// Context for `device`, optionally in reduced precision.
    pub fn new(device: Device, reduced_precision: bool) -> Self {
        let precision = if reduced_precision {
            Precision::reduced_for(device)
        } else {
            Precision::Full
        };
        Self { device, precision }
    }
}
