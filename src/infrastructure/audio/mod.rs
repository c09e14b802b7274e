mod duration_probe;

pub use duration_probe::ContainerDurationProbe;
