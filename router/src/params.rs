use std::{
    borrow::{Borrow, Cow},
    collections::{BTreeMap, HashMap},
    fmt::Display,
    hash::{BuildHasher, Hash},
};

type ParamsMapInner = Vec<(Cow<'static, str>, String)>;

/// Route parameters keyed by name, in the order they were first set.
///
/// Values are always strings: parameters parsed from a path are strings,
/// and values supplied for navigation are stringified so that the two can
/// be compared.
#[derive(Debug, Default, Clone)]
pub struct ParamsMap(ParamsMapInner);

impl ParamsMap {
    /// Creates an empty map.
    #[inline(always)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty map with the given capacity.
    #[inline(always)]
    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    /// Inserts a value into the map, replacing any existing value for that key.
    pub fn insert(&mut self, key: impl Into<Cow<'static, str>>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(prev) = self.0.iter_mut().find(|(k, _)| k == &key) {
            prev.1 = value;
        } else {
            self.0.push((key, value));
        }
    }

    /// Inserts a value only if the key is not already present.
    ///
    /// Returns `true` if the value was inserted.
    pub fn insert_if_absent(
        &mut self,
        key: impl Into<Cow<'static, str>>,
        value: impl Into<String>,
    ) -> bool {
        let key = key.into();
        if self.contains_key(&key) {
            false
        } else {
            self.0.push((key, value.into()));
            true
        }
    }

    /// Fills every key of `other` that is absent here.
    pub fn merge_absent(&mut self, other: &ParamsMap) {
        for (k, v) in other.iter() {
            if !self.contains_key(k) {
                self.0.push((Cow::Owned(k.to_owned()), v.to_owned()));
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.get_str(key).map(ToOwned::to_owned)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find_map(|(k, v)| (k == key).then_some(v.as_str()))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    /// Removes a value from the map.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let idx = self.0.iter().position(|(k, _)| k == key)?;
        Some(self.0.remove(idx).1)
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_ref(), v.as_str()))
    }
}

/// Two maps are equal when they hold the same keys with the same values,
/// regardless of insertion order.
impl PartialEq for ParamsMap {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self.iter().all(|(k, v)| other.get_str(k) == Some(v))
    }
}

impl Eq for ParamsMap {}

impl<K, V> FromIterator<(K, V)> for ParamsMap
where
    K: Into<Cow<'static, str>>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = Self::new();

        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl IntoIterator for ParamsMap {
    type Item = (Cow<'static, str>, String);
    type IntoIter = std::vec::IntoIter<(Cow<'static, str>, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Creates a [`ParamsMap`] from `key => value` pairs. Values may be of any
/// type implementing [`Display`].
#[macro_export]
macro_rules! params_map {
    ($($key:expr => $val:expr),* $(,)?) => ({
        #[allow(unused_mut)]
        let mut map = $crate::ParamsMap::new();
        $( map.insert($key, ::std::string::ToString::to_string(&$val)); )*
        map
    });
}

/// Anything that can supply route parameter values by name when a URI is
/// built from a route.
///
/// Implemented for the common map types and for JSON objects. Entities
/// that expose a generic field accessor should implement [`Model`] and be
/// passed through [`FromModel`].
pub trait ParamSource {
    /// Returns the string form of the named value, if present.
    fn param(&self, name: &str) -> Option<String>;
}

/// A model-like entity exposing a generic accessor.
pub trait Model {
    fn get(&self, name: &str) -> Option<serde_json::Value>;
}

/// Pulls route parameters off a [`Model`].
#[derive(Debug, Clone, Copy)]
pub struct FromModel<'a, M: ?Sized>(pub &'a M);

impl<M> ParamSource for FromModel<'_, M>
where
    M: Model + ?Sized,
{
    fn param(&self, name: &str) -> Option<String> {
        self.0.get(name).as_ref().and_then(json_to_param)
    }
}

fn json_to_param(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

impl ParamSource for () {
    fn param(&self, _name: &str) -> Option<String> {
        None
    }
}

impl<T> ParamSource for &T
where
    T: ParamSource + ?Sized,
{
    fn param(&self, name: &str) -> Option<String> {
        (**self).param(name)
    }
}

impl<T> ParamSource for Option<T>
where
    T: ParamSource,
{
    fn param(&self, name: &str) -> Option<String> {
        self.as_ref().and_then(|source| source.param(name))
    }
}

impl ParamSource for ParamsMap {
    fn param(&self, name: &str) -> Option<String> {
        self.get(name)
    }
}

impl<K, V, S> ParamSource for HashMap<K, V, S>
where
    K: Borrow<str> + Hash + Eq,
    V: Display,
    S: BuildHasher,
{
    fn param(&self, name: &str) -> Option<String> {
        HashMap::get(self, name).map(ToString::to_string)
    }
}

impl<K, V> ParamSource for BTreeMap<K, V>
where
    K: Borrow<str> + Ord,
    V: Display,
{
    fn param(&self, name: &str) -> Option<String> {
        BTreeMap::get(self, name).map(ToString::to_string)
    }
}

impl<K, V> ParamSource for [(K, V)]
where
    K: AsRef<str>,
    V: Display,
{
    fn param(&self, name: &str) -> Option<String> {
        self.iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.to_string())
    }
}

impl<K, V, const N: usize> ParamSource for [(K, V); N]
where
    K: AsRef<str>,
    V: Display,
{
    fn param(&self, name: &str) -> Option<String> {
        self.as_slice().param(name)
    }
}

impl<K, V> ParamSource for Vec<(K, V)>
where
    K: AsRef<str>,
    V: Display,
{
    fn param(&self, name: &str) -> Option<String> {
        self.as_slice().param(name)
    }
}

impl ParamSource for serde_json::Map<String, serde_json::Value> {
    fn param(&self, name: &str) -> Option<String> {
        self.get(name).and_then(json_to_param)
    }
}

impl ParamSource for serde_json::Value {
    fn param(&self, name: &str) -> Option<String> {
        self.as_object().and_then(|obj| obj.param(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn insert_if_absent_keeps_first_value() {
        let mut map = ParamsMap::new();
        assert!(map.insert_if_absent("id", "222"));
        assert!(!map.insert_if_absent("id", "12"));
        assert_eq!(map.get_str("id"), Some("222"));
    }

    #[test]
    fn equality_ignores_order() {
        let a = params_map! { "a" => 1, "b" => "two" };
        let b = params_map! { "b" => "two", "a" => "1" };
        assert_eq!(a, b);
        assert_ne!(a, params_map! { "a" => 1 });
    }

    #[test]
    fn json_values_stringify() {
        let entity = json!({ "parentId": 123, "childName": "sally", "gone": null });
        assert_eq!(entity.param("parentId").as_deref(), Some("123"));
        assert_eq!(entity.param("childName").as_deref(), Some("sally"));
        assert_eq!(entity.param("gone"), None);
        assert_eq!(entity.param("missing"), None);
    }

    struct User {
        id: u32,
    }

    impl Model for User {
        fn get(&self, name: &str) -> Option<serde_json::Value> {
            match name {
                "id" => Some(self.id.into()),
                _ => None,
            }
        }
    }

    #[test]
    fn pulls_values_off_a_model() {
        let user = User { id: 7 };
        let source = FromModel(&user);
        assert_eq!(source.param("id").as_deref(), Some("7"));
        assert_eq!(source.param("name"), None);
    }
}
