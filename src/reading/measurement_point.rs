#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementPoint {
    pub name: String,

    pub value: f64,
}

impl MeasurementPoint {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}
