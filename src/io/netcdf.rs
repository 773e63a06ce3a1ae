use crate::config::TimeDecoding;
use crate::error::{AerosolError, Result};
use crate::grid::{AttrValue, Attributes, Coordinate, GridDataset, Variable};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use netcdf::types::NcVariableType;
use netcdf::AttributeValue;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

fn convert_attribute(value: AttributeValue) -> Option<AttrValue> {
    let numbers = |v: Vec<f64>| Some(AttrValue::Numbers(v));
    match value {
        AttributeValue::Str(s) => Some(AttrValue::Text(s)),
        AttributeValue::Strs(s) => Some(AttrValue::Text(s.join(", "))),
        AttributeValue::Double(v) => Some(AttrValue::Number(v)),
        AttributeValue::Float(v) => Some(AttrValue::Number(v as f64)),
        AttributeValue::Int(v) => Some(AttrValue::Number(v as f64)),
        AttributeValue::Uint(v) => Some(AttrValue::Number(v as f64)),
        AttributeValue::Short(v) => Some(AttrValue::Number(v as f64)),
        AttributeValue::Ushort(v) => Some(AttrValue::Number(v as f64)),
        AttributeValue::Schar(v) => Some(AttrValue::Number(v as f64)),
        AttributeValue::Uchar(v) => Some(AttrValue::Number(v as f64)),
        AttributeValue::Longlong(v) => Some(AttrValue::Number(v as f64)),
        AttributeValue::Ulonglong(v) => Some(AttrValue::Number(v as f64)),
        AttributeValue::Doubles(v) => numbers(v),
        AttributeValue::Floats(v) => numbers(v.into_iter().map(f64::from).collect()),
        AttributeValue::Ints(v) => numbers(v.into_iter().map(f64::from).collect()),
        AttributeValue::Uints(v) => numbers(v.into_iter().map(f64::from).collect()),
        AttributeValue::Shorts(v) => numbers(v.into_iter().map(f64::from).collect()),
        AttributeValue::Ushorts(v) => numbers(v.into_iter().map(f64::from).collect()),
        AttributeValue::Schars(v) => numbers(v.into_iter().map(f64::from).collect()),
        AttributeValue::Uchars(v) => numbers(v.into_iter().map(f64::from).collect()),
        AttributeValue::Longlongs(v) => numbers(v.into_iter().map(|x| x as f64).collect()),
        AttributeValue::Ulonglongs(v) => numbers(v.into_iter().map(|x| x as f64).collect()),
        #[allow(unreachable_patterns)]
        _ => None,
    }
}

fn read_attributes<'a>(attrs: impl Iterator<Item = netcdf::Attribute<'a>>) -> Attributes {
    let mut out = Attributes::new();
    for attr in attrs {
        let name = attr.name().to_string();
        match attr.value() {
            Ok(value) => {
                if let Some(v) = convert_attribute(value) {
                    out.insert(name, v);
                }
            }
            Err(e) => warn!(attribute = %name, error = %e, "skipping unreadable attribute"),
        }
    }
    out
}

/// Fill/missing values become NaN, then scale_factor and add_offset apply.
fn mask_and_scale(mut data: Vec<f64>, attrs: &Attributes) -> Vec<f64> {
    let sentinels: Vec<f64> = ["_FillValue", "missing_value"]
        .iter()
        .filter_map(|k| attrs.get(*k))
        .flat_map(|v| match v {
            AttrValue::Number(n) => vec![*n],
            AttrValue::Numbers(ns) => ns.clone(),
            AttrValue::Text(_) => Vec::new(),
        })
        .collect();
    let scale = attrs
        .get("scale_factor")
        .and_then(|v| v.as_number())
        .unwrap_or(1.0);
    let offset = attrs
        .get("add_offset")
        .and_then(|v| v.as_number())
        .unwrap_or(0.0);

    for v in data.iter_mut() {
        if sentinels.iter().any(|s| s == v || (s.is_nan() && v.is_nan())) {
            *v = f64::NAN;
        } else {
            *v = *v * scale + offset;
        }
    }
    data
}

fn parse_reference_time(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim().trim_end_matches('Z').trim_end_matches(" UTC");
    const FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Decodes CF `"<unit> since <reference>"` time values into ISO-8601 strings.
pub fn decode_cf_times(coordinate: &str, units: &str, values: &[f64]) -> Result<Vec<String>> {
    let fail = || AerosolError::TimeDecode {
        coordinate: coordinate.to_string(),
        units: units.to_string(),
    };
    let (unit, reference) = units.split_once(" since ").ok_or_else(fail)?;
    let seconds_per_unit = match unit.trim().to_lowercase().as_str() {
        "days" | "day" | "d" => 86_400.0,
        "hours" | "hour" | "hrs" | "hr" | "h" => 3_600.0,
        "minutes" | "minute" | "mins" | "min" => 60.0,
        "seconds" | "second" | "secs" | "sec" | "s" => 1.0,
        "milliseconds" | "millisecond" | "ms" => 0.001,
        _ => return Err(fail()),
    };
    let reference = parse_reference_time(reference).ok_or_else(fail)?;

    values
        .iter()
        .map(|v| {
            if v.is_nan() {
                return Ok("NaT".to_string());
            }
            let millis = (v * seconds_per_unit * 1000.0).round();
            if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
                return Err(fail());
            }
            let offset = Duration::try_milliseconds(millis as i64).ok_or_else(fail)?;
            reference
                .checked_add_signed(offset)
                .map(|t| t.format("%Y-%m-%dT%H:%M:%S").to_string())
                .ok_or_else(fail)
        })
        .collect()
}

fn is_numeric(var: &netcdf::Variable) -> bool {
    matches!(
        var.vartype(),
        NcVariableType::Int(_) | NcVariableType::Float(_)
    )
}

/// Opens a NetCDF file and loads every numeric variable into memory.
///
/// 1-D variables named after their own dimension, or listed in another
/// variable's `coordinates` attribute, become coordinates. The file handle is
/// released when this returns.
pub fn open_dataset(path: &Path, time_decoding: TimeDecoding) -> Result<GridDataset> {
    let read_err = |source| AerosolError::SourceRead {
        path: path.to_path_buf(),
        source,
    };
    let file = netcdf::open(path).map_err(read_err)?;

    let mut dataset = GridDataset::new();
    dataset.attrs = read_attributes(file.attributes());

    let mut coord_refs: HashSet<String> = HashSet::new();
    for var in file.variables() {
        if let Some(AttrValue::Text(list)) = read_attributes(var.attributes()).get("coordinates") {
            coord_refs.extend(list.split_whitespace().map(str::to_string));
        }
    }

    for var in file.variables() {
        let name = var.name();
        if !is_numeric(&var) {
            debug!(variable = %name, "skipping non-numeric variable");
            continue;
        }
        let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        let attrs = read_attributes(var.attributes());
        let raw: Vec<f64> = var.get_values::<f64, _>(..).map_err(read_err)?;
        let data = mask_and_scale(raw, &attrs);

        let is_coord = dims.len() == 1 && (dims[0] == name || coord_refs.contains(&name));
        if is_coord {
            let mut coord = Coordinate::new(&dims[0], data);
            if time_decoding == TimeDecoding::Strict && name.eq_ignore_ascii_case("time") {
                if let Some(units) = attrs.get("units").and_then(|u| u.as_text()) {
                    if units.contains(" since ") {
                        coord.labels = Some(decode_cf_times(&name, units, &coord.values)?);
                    }
                }
            }
            coord.attrs = attrs;
            dataset.coords.insert(name, coord);
        } else {
            let mut variable = Variable::new(&name, dims, shape, data)?;
            variable.attrs = attrs;
            dataset.variables.insert(name, variable);
        }
    }

    debug!(
        path = %path.display(),
        variables = dataset.variables.len(),
        coords = dataset.coords.len(),
        "opened dataset"
    );
    Ok(dataset)
}

fn put_attribute(var: &mut netcdf::VariableMut, key: &str, value: &AttrValue) -> Result<()> {
    match value {
        AttrValue::Text(s) => var.put_attribute(key, s.as_str())?,
        AttrValue::Number(n) => var.put_attribute(key, *n)?,
        AttrValue::Numbers(ns) => var.put_attribute(key, ns.clone())?,
    };
    Ok(())
}

/// Writes a dataset to a new NetCDF file. Values are stored as decoded f64,
/// so packing attributes (`scale_factor`, `add_offset`) are not written back
/// and NaN is used as the fill value.
pub fn write_dataset(path: &Path, dataset: &GridDataset) -> Result<()> {
    let mut file = netcdf::create(path)?;

    for (dim, len) in dataset.dims() {
        file.add_dimension(&dim, len)?;
    }

    let skip = ["scale_factor", "add_offset", "_FillValue", "missing_value"];

    for (name, coord) in &dataset.coords {
        let mut var = file.add_variable::<f64>(name, &[coord.dim.as_str()])?;
        for (k, v) in coord.attrs.iter().filter(|(k, _)| !skip.contains(&k.as_str())) {
            put_attribute(&mut var, k, v)?;
        }
        var.put_values(&coord.values, ..)?;
    }

    for (name, variable) in &dataset.variables {
        let dims: Vec<&str> = variable.dims.iter().map(String::as_str).collect();
        let mut var = file.add_variable::<f64>(name, &dims)?;
        var.set_fill_value(f64::NAN)?;
        for (k, v) in variable
            .attrs
            .iter()
            .filter(|(k, _)| !skip.contains(&k.as_str()))
        {
            put_attribute(&mut var, k, v)?;
        }
        if variable.size() > 0 {
            var.put_values(&variable.data, ..)?;
        }
    }

    for (k, v) in &dataset.attrs {
        match v {
            AttrValue::Text(s) => file.add_attribute(k, s.as_str())?,
            AttrValue::Number(n) => file.add_attribute(k, *n)?,
            AttrValue::Numbers(ns) => file.add_attribute(k, ns.clone())?,
        };
    }

    Ok(())
}
