use std::fmt;
use std::hash::{Hash, Hasher};

use super::{Item, Value};
use crate::error::{EngineError, ErrorKind};

/// A 1-based ordered list of values. Mutation has value semantics: every
/// mutator returns a new array and leaves the receiver untouched.
#[derive(Debug, Clone)]
pub struct ValueArray<N> {
    members: Vec<Value<N>>,
}

impl<N: Clone> ValueArray<N> {
    pub fn new() -> Self {
        Self { members: Vec::new() }
    }

    pub fn from_members(members: Vec<Value<N>>) -> Self {
        Self { members }
    }

    /// The member at a 1-based index. Out-of-range access is an error, in
    /// contrast to map lookup which is total.
    pub fn get(&self, index: i64) -> Result<&Value<N>, EngineError> {
        let out_of_bounds = || {
            EngineError::new(ErrorKind::IndexOutOfBounds {
                index,
                size: self.members.len(),
            })
        };
        if index < 1 {
            return Err(out_of_bounds());
        }
        self.members.get(index as usize - 1).ok_or_else(out_of_bounds)
    }

    pub fn put(&self, index: i64, value: Value<N>) -> Result<Self, EngineError> {
        self.get(index)?;
        let mut new_arr = self.clone();
        new_arr.members[index as usize - 1] = value;
        Ok(new_arr)
    }

    pub fn append(&self, value: Value<N>) -> Self {
        let mut new_arr = self.clone();
        new_arr.members.push(value);
        new_arr
    }

    pub fn insert_before(&self, index: i64, value: Value<N>) -> Result<Self, EngineError> {
        if index < 1 || index as usize > self.members.len() + 1 {
            return Err(EngineError::new(ErrorKind::IndexOutOfBounds {
                index,
                size: self.members.len(),
            }));
        }
        let mut new_arr = self.clone();
        new_arr.members.insert(index as usize - 1, value);
        Ok(new_arr)
    }

    pub fn remove(&self, index: i64) -> Result<Self, EngineError> {
        self.get(index)?;
        let mut new_arr = self.clone();
        new_arr.members.remove(index as usize - 1);
        Ok(new_arr)
    }

    pub fn subarray(&self, start: i64, length: usize) -> Result<Self, EngineError> {
        if start < 1 || (start as usize > self.members.len() + 1) {
            return Err(EngineError::new(ErrorKind::IndexOutOfBounds {
                index: start,
                size: self.members.len(),
            }));
        }
        let begin = start as usize - 1;
        let end = (begin + length).min(self.members.len());
        Ok(Self::from_members(self.members[begin..end].to_vec()))
    }

    pub fn head(&self) -> Option<&Value<N>> {
        self.members.first()
    }

    pub fn tail(&self) -> Option<Self> {
        if self.members.is_empty() {
            return None;
        }
        Some(Self::from_members(self.members[1..].to_vec()))
    }

    pub fn reverse(&self) -> Self {
        let mut reversed = self.members.clone();
        reversed.reverse();
        Self::from_members(reversed)
    }

    pub fn join(arrays: &[ValueArray<N>]) -> Self {
        let total: usize = arrays.iter().map(|a| a.members.len()).sum();
        let mut result = Vec::with_capacity(total);
        for arr in arrays {
            result.extend(arr.members.iter().cloned());
        }
        Self::from_members(result)
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> &[Value<N>] {
        &self.members
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Value<N>> {
        self.members.iter()
    }

    /// Expands the array into a flat item sequence, recursing into nested
    /// arrays.
    pub fn flatten(&self) -> Vec<Item<N>> {
        let mut result = Vec::new();
        for member in &self.members {
            for item in member.items() {
                if let Item::Array(arr) = item {
                    result.extend(arr.flatten());
                } else {
                    result.push(item.clone());
                }
            }
        }
        result
    }
}

impl<N: Clone> Default for ValueArray<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: PartialEq + Clone> PartialEq for ValueArray<N> {
    fn eq(&self, other: &Self) -> bool {
        self.members == other.members
    }
}

impl<N: Eq + Clone> Eq for ValueArray<N> {}

impl<N: Hash + Clone> Hash for ValueArray<N> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.members.len().hash(state);
        for member in &self.members {
            member.hash(state);
        }
    }
}

impl<N: fmt::Debug + Clone> fmt::Display for ValueArray<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, member) in self.members.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:?}", member)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AtomicValue;

    fn int_val<N: Clone>(i: i64) -> Value<N> {
        Value::from_atomic(AtomicValue::Integer(i))
    }

    #[test]
    fn one_based_get() {
        let arr: ValueArray<()> =
            ValueArray::from_members(vec![int_val(10), int_val(20), int_val(30)]);
        assert_eq!(arr.get(1).unwrap(), &int_val(10));
        assert_eq!(arr.get(3).unwrap(), &int_val(30));

        for bad in [0, 4, -1] {
            let err = arr.get(bad).unwrap_err();
            assert!(matches!(err.kind, ErrorKind::IndexOutOfBounds { size: 3, .. }));
        }
    }

    #[test]
    fn put_is_copy_on_write() {
        let arr: ValueArray<()> = ValueArray::from_members(vec![int_val(1), int_val(2)]);
        let updated = arr.put(2, int_val(9)).unwrap();
        assert_eq!(arr.get(2).unwrap(), &int_val(2));
        assert_eq!(updated.get(2).unwrap(), &int_val(9));
        assert!(arr.put(3, int_val(9)).is_err());
    }

    #[test]
    fn insert_and_remove() {
        let arr: ValueArray<()> = ValueArray::from_members(vec![int_val(1), int_val(3)]);
        let arr2 = arr.insert_before(2, int_val(2)).unwrap();
        assert_eq!(arr2.size(), 3);
        assert_eq!(arr2.get(2).unwrap(), &int_val(2));

        let arr3 = arr2.remove(1).unwrap();
        assert_eq!(arr3.size(), 2);
        assert_eq!(arr3.get(1).unwrap(), &int_val(2));

        // Appending at size+1 via insert_before is allowed.
        assert!(arr.insert_before(3, int_val(4)).is_ok());
        assert!(arr.insert_before(4, int_val(4)).is_err());
    }

    #[test]
    fn subarray_clamps_length() {
        let arr: ValueArray<()> = ValueArray::from_members(
            (1..=5).map(int_val).collect(),
        );
        assert_eq!(arr.subarray(2, 3).unwrap().size(), 3);
        assert_eq!(arr.subarray(4, 10).unwrap().size(), 2);
        assert!(arr.subarray(0, 1).is_err());
    }

    #[test]
    fn flatten_recurses() {
        let inner: ValueArray<()> = ValueArray::from_members(vec![int_val(2), int_val(3)]);
        let outer: ValueArray<()> =
            ValueArray::from_members(vec![int_val(1), Value::from_array(inner)]);
        let flat = outer.flatten();
        assert_eq!(flat.len(), 3);
    }
}
