//! Generation-checked object arena.
//!
//! A [`Registry`] owns its objects and hands out small copyable
//! [`Handle`]s. Freed slots are reused, and each reuse bumps the slot's
//! generation so a handle to the previous occupant no longer resolves.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Typed reference into a [`Registry`].
pub struct Handle<T> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

// Manual impls so `T` needs no bounds.
impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}v{})", self.index, self.generation)
    }
}

enum Slot<T> {
    Occupied { generation: u32, value: T },
    Vacant { generation: u32, next_free: Option<u32> },
}

/// Arena of `T` addressed by [`Handle<T>`].
pub struct Registry<T> {
    slots: Vec<Slot<T>>,
    free_head: Option<u32>,
    len: usize,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_head: None,
            len: 0,
        }
    }

    /// Store `value` and return its handle.
    pub fn insert(&mut self, value: T) -> Handle<T> {
        self.len += 1;
        match self.free_head {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                let (generation, next_free) = match slot {
                    Slot::Vacant {
                        generation,
                        next_free,
                    } => (generation.wrapping_add(1), *next_free),
                    Slot::Occupied { .. } => unreachable!("free list points at occupied slot"),
                };
                *slot = Slot::Occupied { generation, value };
                self.free_head = next_free;
                Handle {
                    index,
                    generation,
                    _marker: PhantomData,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot::Occupied {
                    generation: 0,
                    value,
                });
                Handle {
                    index,
                    generation: 0,
                    _marker: PhantomData,
                }
            }
        }
    }

    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        match self.slots.get(handle.index as usize) {
            Some(Slot::Occupied { generation, value }) if *generation == handle.generation => {
                Some(value)
            }
            _ => None,
        }
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        match self.slots.get_mut(handle.index as usize) {
            Some(Slot::Occupied { generation, value }) if *generation == handle.generation => {
                Some(value)
            }
            _ => None,
        }
    }

    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.get(handle).is_some()
    }

    /// Take the value out, invalidating `handle` and every copy of it.
    pub fn remove(&mut self, handle: Handle<T>) -> Option<T> {
        if !self.contains(handle) {
            return None;
        }
        let vacant = Slot::Vacant {
            generation: handle.generation,
            next_free: self.free_head,
        };
        let old = std::mem::replace(&mut self.slots[handle.index as usize], vacant);
        self.free_head = Some(handle.index);
        self.len -= 1;
        match old {
            Slot::Occupied { value, .. } => Some(value),
            Slot::Vacant { .. } => None,
        }
    }

    /// Remove everything. Outstanding handles stay invalid afterwards.
    pub fn clear(&mut self) -> Vec<T> {
        let handles: Vec<Handle<T>> = self.iter().map(|(h, _)| h).collect();
        handles.into_iter().filter_map(|h| self.remove(h)).collect()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match slot {
                Slot::Occupied { generation, value } => Some((
                    Handle {
                        index: index as u32,
                        generation: *generation,
                        _marker: PhantomData,
                    },
                    value,
                )),
                Slot::Vacant { .. } => None,
            })
    }
}

impl<T> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("len", &self.len)
            .field("capacity", &self.slots.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut registry = Registry::new();
        let a = registry.insert("a");
        let b = registry.insert("b");
        assert_eq!(registry.get(a), Some(&"a"));
        assert_eq!(registry.get(b), Some(&"b"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_stale_handle_after_reuse() {
        let mut registry = Registry::new();
        let first = registry.insert(1);
        assert_eq!(registry.remove(first), Some(1));
        let second = registry.insert(2);

        assert_eq!(first.index(), second.index());
        assert_ne!(first, second);
        assert_eq!(registry.get(first), None);
        assert_eq!(registry.get(second), Some(&2));
        assert_eq!(registry.remove(first), None);
    }

    #[test]
    fn test_get_mut() {
        let mut registry = Registry::new();
        let h = registry.insert(vec![1]);
        registry.get_mut(h).unwrap().push(2);
        assert_eq!(registry.get(h), Some(&vec![1, 2]));
    }

    #[test]
    fn test_clear_invalidates_handles() {
        let mut registry = Registry::new();
        let handles: Vec<_> = (0..4).map(|i| registry.insert(i)).collect();
        let mut values = registry.clear();
        values.sort();
        assert_eq!(values, vec![0, 1, 2, 3]);
        assert!(registry.is_empty());
        for h in handles {
            assert!(!registry.contains(h));
        }
    }

    #[test]
    fn test_free_list_reuses_slots() {
        let mut registry = Registry::new();
        let a = registry.insert('a');
        let b = registry.insert('b');
        registry.remove(a);
        registry.remove(b);
        registry.insert('c');
        registry.insert('d');
        registry.insert('e');
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.iter().count(), 3);
    }
}
