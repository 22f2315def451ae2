/// Index of the first maximum of `values`, ignoring NaN.
pub fn peak_index(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .fold(None, |best: Option<(usize, f64)>, (i, &v)| match best {
            Some((_, b)) if v <= b => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

/// Wavelength at which `smoothed` peaks.
pub fn peak_wavelength(wavelength: &[f64], smoothed: &[f64]) -> Option<f64> {
    peak_index(smoothed).and_then(|i| wavelength.get(i).copied())
}
