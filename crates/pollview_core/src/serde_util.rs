use serde::{Deserialize, Deserializer};

/// The backend serializes boxed Java values, so any numeric or list field may
/// arrive as `null`. Pair with `#[serde(default)]` to also cover absence.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
