/// Data layer: frames, and their on-disk form.
///
/// Architecture:
/// ```text
///   SpectrometerSession::sample()
///        │
///        ▼
///   ┌──────────┐
///   │  Frame    │  validated wavelength / intensity pair
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  writer   │  Frame → spectrum_data_{n}.csv
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  spectrum_data_{n}.csv → FrameFile
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod writer;

pub const FRAME_FILE_PREFIX: &str = "spectrum_data_";
pub const FRAME_FILE_EXTENSION: &str = "csv";
