//! Skip list over the document IDs of one posting list.
//!
//! [`SkipList`] is the in-memory build structure: an arena of nodes whose
//! forward links are arena indices. [`SkipList::serialize`] flattens it into
//! the byte layout below, which [`SkipListReader`] searches and intersects in
//! place without rebuilding any links.
//!
//! ```text
//! [top:4][start(top):4][start(top-1):4]...[start(0):4]
//! level top: [HEADER_KEY,down,up][k1,down,up]...[END_KEY]
//! ...
//! level 0:   [HEADER_KEY,down,up][k1,down,up]...[END_KEY]
//! ```
//!
//! Every record is 12 bytes, `down`/`up` are absolute byte offsets of the
//! same key's record one level below/above, 0 meaning "no such record".
//! All integers are little-endian `u32`.

use crate::{IndexError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Key of the per-level header record.
pub const HEADER_KEY: u32 = (1 << 31) - 1;
/// Terminates every level run in the serialized form.
pub const END_KEY: u32 = HEADER_KEY - 1;
pub const MAX_LEVEL: usize = 20;
const PROMOTION_PROBABILITY: f64 = 0.25;
const RECORD: usize = 12;
const HEADER: usize = 0;

struct Node {
    key: u32,
    forward: Vec<Option<usize>>,
}

pub struct SkipList {
    nodes: Vec<Node>,
    free: Vec<usize>,
    level: usize,
    len: usize,
    rng: StdRng,
}

impl Default for SkipList {
    fn default() -> Self {
        Self::new()
    }
}

impl SkipList {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic level promotion, for reproducible layouts.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        let header = Node { key: HEADER_KEY, forward: vec![None; MAX_LEVEL] };
        Self { nodes: vec![header], free: Vec::new(), level: 0, len: 0, rng }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Index of the highest non-empty level (0 for an empty list).
    pub fn level(&self) -> usize {
        self.level
    }

    fn random_level(&mut self) -> usize {
        let mut level = 0;
        while level < MAX_LEVEL - 1 && self.rng.gen::<f64>() < PROMOTION_PROBABILITY {
            level += 1;
        }
        level
    }

    /// Per level, the last node whose successor is not below `key`.
    fn find_update(&self, key: u32) -> ([usize; MAX_LEVEL], usize) {
        let mut update = [HEADER; MAX_LEVEL];
        let mut x = HEADER;
        for i in (0..=self.level).rev() {
            while let Some(next) = self.nodes[x].forward[i] {
                if self.nodes[next].key < key {
                    x = next;
                } else {
                    break;
                }
            }
            update[i] = x;
        }
        (update, x)
    }

    fn alloc(&mut self, key: u32, height: usize) -> usize {
        let node = Node { key, forward: vec![None; height] };
        match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = node;
                idx
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    /// Inserts `key`; returns false when it was already present.
    ///
    /// Keys at or above [`END_KEY`] are reserved and rejected.
    pub fn insert(&mut self, key: u32) -> Result<bool> {
        if key >= END_KEY {
            return Err(IndexError::InvalidOperation(format!(
                "skip list key {key} collides with reserved keys"
            )));
        }
        let (mut update, x) = self.find_update(key);
        if let Some(next) = self.nodes[x].forward[0] {
            if self.nodes[next].key == key {
                return Ok(false);
            }
        }

        let mut new_level = self.random_level();
        if new_level > self.level {
            // grow by at most one level per insertion
            self.level += 1;
            new_level = self.level;
            update[new_level] = HEADER;
        }

        let idx = self.alloc(key, new_level + 1);
        for (i, &prev) in update.iter().enumerate().take(new_level + 1) {
            self.nodes[idx].forward[i] = self.nodes[prev].forward[i];
            self.nodes[prev].forward[i] = Some(idx);
        }
        self.len += 1;
        Ok(true)
    }

    /// Builds a list from `keys` with entropy-seeded levels.
    pub fn from_keys(keys: impl IntoIterator<Item = u32>) -> Result<Self> {
        let mut sl = SkipList::new();
        for key in keys {
            sl.insert(key)?;
        }
        Ok(sl)
    }

    pub fn search(&self, key: u32) -> Option<u32> {
        let (_, x) = self.find_update(key);
        let next = self.nodes[x].forward[0]?;
        (self.nodes[next].key == key).then_some(key)
    }

    pub fn contains(&self, key: u32) -> bool {
        self.search(key).is_some()
    }

    /// Removes `key`; returns false when it was absent.
    pub fn erase(&mut self, key: u32) -> bool {
        let (update, x) = self.find_update(key);
        let target = match self.nodes[x].forward[0] {
            Some(t) if self.nodes[t].key == key => t,
            _ => return false,
        };

        for (i, &prev) in update.iter().enumerate().take(self.level + 1) {
            if self.nodes[prev].forward[i] != Some(target) {
                break;
            }
            self.nodes[prev].forward[i] = self.nodes[target].forward[i];
        }
        while self.level > 0 && self.nodes[HEADER].forward[self.level].is_none() {
            self.level -= 1;
        }

        self.nodes[target].forward.clear();
        self.free.push(target);
        self.len -= 1;
        true
    }

    /// Keys linked at `level`, ascending.
    pub fn keys_at_level(&self, level: usize) -> Vec<u32> {
        let mut keys = Vec::new();
        if level >= MAX_LEVEL {
            return keys;
        }
        let mut x = self.nodes[HEADER].forward[level];
        while let Some(idx) = x {
            keys.push(self.nodes[idx].key);
            x = self.nodes[idx].forward[level];
        }
        keys
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        std::iter::successors(self.nodes[HEADER].forward[0], move |&idx| self.nodes[idx].forward[0])
            .map(move |idx| self.nodes[idx].key)
    }

    /// Flattens the list into the byte layout described in the module docs.
    ///
    /// Record positions are computed before anything is written, so every
    /// down/up offset is filled in as its record is emitted.
    pub fn serialize(&self) -> Vec<u8> {
        let top = self.level;
        let levels: Vec<Vec<u32>> = (0..=top).map(|i| self.keys_at_level(i)).collect();

        let mut starts = vec![0usize; top + 1];
        let mut offset = 4 + 4 * (top + 1);
        for i in (0..=top).rev() {
            starts[i] = offset;
            offset += RECORD * (levels[i].len() + 1) + 4;
        }

        // position of `key`'s record at `level`, 0 when the key is not linked there
        let position = |level: usize, key: u32| -> u32 {
            match levels[level].binary_search(&key) {
                Ok(slot) => (starts[level] + RECORD * (slot + 1)) as u32,
                Err(_) => 0,
            }
        };

        let mut buf = Vec::with_capacity(offset);
        put_u32(&mut buf, top as u32);
        for i in (0..=top).rev() {
            put_u32(&mut buf, starts[i] as u32);
        }

        for i in (0..=top).rev() {
            let header_down = if i > 0 { starts[i - 1] as u32 } else { 0 };
            let header_up = if i < top { starts[i + 1] as u32 } else { 0 };
            put_record(&mut buf, HEADER_KEY, header_down, header_up);

            for &key in &levels[i] {
                let down = if i > 0 { position(i - 1, key) } else { 0 };
                let up = if i < top { position(i + 1, key) } else { 0 };
                put_record(&mut buf, key, down, up);
            }
            put_u32(&mut buf, END_KEY);
        }
        debug_assert_eq!(buf.len(), offset);
        buf
    }
}

fn put_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn put_record(buf: &mut Vec<u8>, key: u32, down: u32, up: u32) {
    put_u32(buf, key);
    put_u32(buf, down);
    put_u32(buf, up);
}

/// Read-only view over a serialized skip list.
#[derive(Debug, Clone)]
pub struct SkipListReader {
    buf: Vec<u8>,
    top: usize,
}

impl SkipListReader {
    /// Validates the header, the level run boundaries and every record's links.
    pub fn new(buf: Vec<u8>) -> Result<Self> {
        if buf.len() < 4 {
            return Err(IndexError::corrupt("skip list shorter than its header"));
        }
        let top = read_u32(&buf, 0) as usize;
        if top >= MAX_LEVEL {
            return Err(IndexError::corrupt(format!("skip list has {} levels", top + 1)));
        }
        let header_len = 4 + 4 * (top + 1);
        if buf.len() < header_len {
            return Err(IndexError::corrupt("skip list level table is truncated"));
        }
        let reader = Self { buf, top };

        let mut expected = header_len;
        for level in (0..=top).rev() {
            let start = reader.level_start(level);
            if start != expected {
                return Err(IndexError::corrupt(format!("level {level} starts at {start}, expected {expected}")));
            }
            let end = if level == 0 {
                reader.buf.len().checked_sub(4)
            } else {
                (read_u32(&reader.buf, 4 + 4 * (top - level + 1)) as usize).checked_sub(4)
            };
            let end = match end {
                Some(e) if e >= start + RECORD && (e - start) % RECORD == 0 && e + 4 <= reader.buf.len() => e,
                _ => return Err(IndexError::corrupt(format!("level {level} run is malformed"))),
            };
            if reader.key(start) != HEADER_KEY || reader.key(end) != END_KEY {
                return Err(IndexError::corrupt(format!("level {level} is missing its header or end marker")));
            }
            expected = end + 4;
        }
        if expected != reader.buf.len() {
            return Err(IndexError::corrupt("trailing bytes after level 0"));
        }
        for level in 0..=top {
            reader.check_links(level)?;
        }
        Ok(reader)
    }

    // Keys strictly ascend within a run; every down/up link lands on the same
    // key one level below/above. Searches follow links unchecked after this.
    fn check_links(&self, level: usize) -> Result<()> {
        let start = self.level_start(level);
        let end = self.level_end(level);
        let header_down = if level > 0 { self.level_start(level - 1) } else { 0 };
        let header_up = if level < self.top { self.level_start(level + 1) } else { 0 };
        if self.down(start) != header_down || self.up(start) != header_up {
            return Err(IndexError::corrupt(format!("level {level} header links are wrong")));
        }

        let mut prev = None;
        for pos in (start + RECORD..end).step_by(RECORD) {
            let key = self.key(pos);
            if key >= END_KEY || prev.is_some_and(|p| p >= key) {
                return Err(IndexError::corrupt(format!("level {level}: key {key} out of order at byte {pos}")));
            }
            prev = Some(key);

            let down = self.down(pos);
            let down_ok = if level == 0 { down == 0 } else { self.record_of(level - 1, down, key) };
            let up = self.up(pos);
            let up_ok = up == 0 || (level < self.top && self.record_of(level + 1, up, key));
            if !down_ok || !up_ok {
                return Err(IndexError::corrupt(format!("level {level}: bad links on key {key} at byte {pos}")));
            }
        }
        Ok(())
    }

    fn record_of(&self, level: usize, pos: usize, key: u32) -> bool {
        let start = self.level_start(level);
        pos > start && pos < self.level_end(level) && (pos - start) % RECORD == 0 && self.key(pos) == key
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn level(&self) -> usize {
        self.top
    }

    /// Number of keys stored at level 0.
    pub fn len(&self) -> usize {
        (self.level_end(0) - self.level_start(0)) / RECORD - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn level_start(&self, level: usize) -> usize {
        read_u32(&self.buf, 4 + 4 * (self.top - level)) as usize
    }

    // Offset of the END_KEY marker closing `level`.
    fn level_end(&self, level: usize) -> usize {
        if level == 0 {
            self.buf.len() - 4
        } else {
            self.level_start(level - 1) - 4
        }
    }

    fn key(&self, pos: usize) -> u32 {
        read_u32(&self.buf, pos)
    }

    fn down(&self, pos: usize) -> usize {
        read_u32(&self.buf, pos + 4) as usize
    }

    fn up(&self, pos: usize) -> usize {
        read_u32(&self.buf, pos + 8) as usize
    }

    pub fn search(&self, target: u32) -> Option<u32> {
        if target >= END_KEY {
            return None;
        }
        let mut pos = self.level_start(self.top);
        for level in (0..=self.top).rev() {
            let end = self.level_end(level);
            while pos + RECORD < end && self.key(pos + RECORD) < target {
                pos += RECORD;
            }
            if level > 0 {
                pos = self.down(pos);
            }
        }
        let next = pos + RECORD;
        (next < self.level_end(0) && self.key(next) == target).then_some(target)
    }

    pub fn contains(&self, target: u32) -> bool {
        self.search(target).is_some()
    }

    pub fn get_all_items(&self) -> Vec<u32> {
        let mut items = Vec::with_capacity(self.len());
        let mut pos = self.level_start(0) + RECORD;
        while self.key(pos) != END_KEY {
            items.push(self.key(pos));
            pos += RECORD;
        }
        items
    }

    /// Climbs the tower of the level-0 record at `pos` and returns the level-0
    /// offset of the farthest successor whose key is still `<= bound`.
    fn skip_target(&self, pos: usize, bound: u32) -> Option<usize> {
        let mut up = self.up(pos);
        let mut best = None;
        let mut level = 1;
        while up != 0 {
            let key = self.key(up + RECORD);
            if key == END_KEY || key > bound {
                break;
            }
            best = Some((up + RECORD, level));
            up = self.up(up);
            level += 1;
        }
        best.map(|(mut p, level)| {
            for _ in 0..level {
                p = self.down(p);
            }
            p
        })
    }

    fn advance(&self, pos: usize, bound: u32) -> usize {
        match self.skip_target(pos, bound) {
            Some(mut p) => {
                while let Some(next) = self.skip_target(p, bound) {
                    p = next;
                }
                p
            }
            None => pos + RECORD,
        }
    }
}

fn read_u32(buf: &[u8], pos: usize) -> u32 {
    let mut b = [0u8; 4];
    b.copy_from_slice(&buf[pos..pos + 4]);
    u32::from_le_bytes(b)
}

/// Intersects two serialized skip lists, jumping over runs of smaller keys
/// through the upper levels instead of stepping one record at a time.
pub fn fast_posting_lists_intersection(a: &SkipListReader, b: &SkipListReader) -> Vec<u32> {
    let mut out = Vec::with_capacity(a.len().min(b.len()));
    let mut pa = a.level_start(0);
    let mut pb = b.level_start(0);
    loop {
        let ka = a.key(pa);
        let kb = b.key(pb);
        if ka == END_KEY || kb == END_KEY {
            break;
        }
        if ka == kb {
            if ka != HEADER_KEY {
                out.push(ka);
            }
            pa += RECORD;
            pb += RECORD;
        } else if ka < kb {
            pa = a.advance(pa, kb);
        } else {
            pb = b.advance(pb, ka);
        }
    }
    out
}

/// Linear two-pointer intersection of two sorted posting lists.
pub fn posting_list_intersection(a: &[u32], b: &[u32]) -> Vec<u32> {
    let (mut i, mut j) = (0, 0);
    let mut out = Vec::new();
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    const KEYS: [u32; 10] = [3, 9, 7, 6, 12, 17, 19, 21, 25, 26];

    fn reader_for(keys: impl IntoIterator<Item = u32>, seed: u64) -> SkipListReader {
        let mut sl = SkipList::with_seed(seed);
        for k in keys {
            sl.insert(k).unwrap();
        }
        SkipListReader::new(sl.serialize()).unwrap()
    }

    #[test]
    fn in_memory_search_and_erase() {
        let mut sl = SkipList::with_seed(7);
        for k in KEYS {
            assert!(sl.insert(k).unwrap());
        }
        assert!(!sl.insert(9).unwrap());
        assert_eq!(sl.search(17), Some(17));
        assert_eq!(sl.search(18), None);
        assert!(sl.erase(9));
        assert!(!sl.erase(9));
        assert_eq!(sl.search(9), None);
        assert!(sl.erase(17));
        assert_eq!(sl.search(26), Some(26));
        assert_eq!(sl.len(), 8);

        for i in 1..=1000 {
            sl.insert(2 * i).unwrap();
        }
        for i in 1..=1000 {
            assert_eq!(sl.search(2 * i), Some(2 * i));
        }
    }

    #[test]
    fn erasing_everything_collapses_levels() {
        let mut sl = SkipList::with_seed(3);
        for k in 0..500 {
            sl.insert(k).unwrap();
        }
        assert!(sl.level() > 0);
        for k in 0..500 {
            assert!(sl.erase(k));
        }
        assert!(sl.is_empty());
        assert_eq!(sl.level(), 0);
        assert_eq!(sl.iter().count(), 0);
        // freed slots are reused
        sl.insert(42).unwrap();
        assert_eq!(sl.iter().collect::<Vec<_>>(), vec![42]);
    }

    #[test]
    fn reader_finds_inserted_keys_only() {
        let reader = reader_for(KEYS, 11);
        for k in KEYS {
            assert_eq!(reader.search(k), Some(k));
        }
        for k in [0, 1, 18, 27, 1000, END_KEY, HEADER_KEY, u32::MAX] {
            assert_eq!(reader.search(k), None);
        }
        assert_eq!(reader.get_all_items(), vec![3, 6, 7, 9, 12, 17, 19, 21, 25, 26]);
        assert_eq!(reader.len(), 10);
    }

    #[test]
    fn empty_list_serializes_to_header_and_end() {
        let sl = SkipList::new();
        let bytes = sl.serialize();
        assert_eq!(bytes.len(), 4 + 4 + RECORD + 4);
        let reader = SkipListReader::new(bytes).unwrap();
        assert!(reader.is_empty());
        assert_eq!(reader.search(5), None);
        assert!(reader.get_all_items().is_empty());
    }

    #[test]
    fn layout_offsets_point_at_the_same_key() {
        let mut sl = SkipList::with_seed(5);
        for k in 0..300 {
            sl.insert(k * 3).unwrap();
        }
        let reader = SkipListReader::new(sl.serialize()).unwrap();
        for level in 0..=reader.level() {
            let mut pos = reader.level_start(level);
            while reader.key(pos) != END_KEY {
                let key = reader.key(pos);
                if level > 0 {
                    assert_eq!(reader.key(reader.down(pos)), key);
                } else {
                    assert_eq!(reader.down(pos), 0);
                }
                let up = reader.up(pos);
                if up != 0 {
                    assert_eq!(reader.key(up), key);
                }
                pos += RECORD;
            }
        }
    }

    #[test]
    fn corrupt_buffers_are_rejected() {
        assert!(SkipListReader::new(vec![]).is_err());
        assert!(SkipListReader::new(vec![25, 0, 0, 0]).is_err());
        let mut bytes = SkipList::from_keys([1, 2, 3]).unwrap().serialize();
        bytes.pop();
        assert!(SkipListReader::new(bytes).is_err());
    }

    #[test]
    fn reserved_keys_are_refused() {
        let mut sl = SkipList::with_seed(1);
        assert!(matches!(sl.insert(END_KEY), Err(IndexError::InvalidOperation(_))));
        assert!(matches!(sl.insert(HEADER_KEY), Err(IndexError::InvalidOperation(_))));
        assert!(SkipList::from_keys([1, u32::MAX]).is_err());
        assert!(sl.insert(END_KEY - 1).unwrap());
        assert_eq!(sl.len(), 1);
    }

    fn put_at(bytes: &mut [u8], pos: usize, v: u32) {
        bytes[pos..pos + 4].copy_from_slice(&v.to_le_bytes());
    }

    #[test]
    fn broken_record_links_are_corrupt() {
        let mut sl = SkipList::with_seed(9);
        for k in 0..2000 {
            sl.insert(k).unwrap();
        }
        let bytes = sl.serialize();
        let reader = SkipListReader::new(bytes.clone()).unwrap();
        let top = reader.level();
        assert!(top > 0);
        let first_top = reader.level_start(top) + RECORD;
        let first_bottom = reader.level_start(0) + RECORD;

        // down link far past the buffer
        let mut far = bytes.clone();
        put_at(&mut far, first_top + 4, 0x00ff_ffff);
        assert!(matches!(SkipListReader::new(far), Err(IndexError::Corrupt(_))));

        // down link onto a different key one level below
        let mut wrong_key = bytes.clone();
        let below = reader.down(first_top);
        put_at(&mut wrong_key, first_top + 4, (below + RECORD) as u32);
        assert!(matches!(SkipListReader::new(wrong_key), Err(IndexError::Corrupt(_))));

        // up link pointing back into its own level
        let mut backward = bytes.clone();
        put_at(&mut backward, first_bottom + RECORD + 8, first_bottom as u32);
        assert!(matches!(SkipListReader::new(backward), Err(IndexError::Corrupt(_))));

        // keys out of order at level 0
        let mut unsorted = bytes;
        put_at(&mut unsorted, first_bottom, 1500);
        assert!(matches!(SkipListReader::new(unsorted), Err(IndexError::Corrupt(_))));
    }

    #[test]
    fn identical_lists_intersect_to_themselves() {
        let a = reader_for(KEYS, 1);
        let b = reader_for(KEYS, 2);
        assert_eq!(fast_posting_lists_intersection(&a, &b), vec![3, 6, 7, 9, 12, 17, 19, 21, 25, 26]);
    }

    #[test]
    fn multiples_of_ten_and_three() {
        let a = reader_for((1..=1000).map(|i| i * 10), 21);
        let b = reader_for((1..=1000).map(|i| i * 3), 22);
        let got = fast_posting_lists_intersection(&a, &b);
        assert_eq!(got.len(), 100);
        assert_eq!(got.first(), Some(&30));
        assert_eq!(got.last(), Some(&3000));
        assert_eq!(got, fast_posting_lists_intersection(&b, &a));
    }

    #[test]
    fn disjoint_and_empty_intersections() {
        let evens = reader_for((0..500).map(|i| i * 2), 4);
        let odds = reader_for((0..500).map(|i| i * 2 + 1), 5);
        let empty = reader_for(std::iter::empty(), 6);
        assert!(fast_posting_lists_intersection(&evens, &odds).is_empty());
        assert!(fast_posting_lists_intersection(&evens, &empty).is_empty());
        assert!(fast_posting_lists_intersection(&empty, &empty).is_empty());
    }

    #[test]
    fn linear_intersection() {
        assert_eq!(posting_list_intersection(&[1, 3, 5, 7], &[2, 3, 4, 7, 9]), vec![3, 7]);
        assert!(posting_list_intersection(&[], &[1]).is_empty());
    }

    proptest! {
        #[test]
        fn levels_nest_and_level_zero_is_the_key_set(
            keys in proptest::collection::vec(0u32..5000, 0..400),
            erase in proptest::collection::vec(0u32..5000, 0..100),
            seed in any::<u64>(),
        ) {
            let mut sl = SkipList::with_seed(seed);
            let mut model = BTreeSet::new();
            for k in &keys {
                sl.insert(*k).unwrap();
                model.insert(*k);
            }
            for k in &erase {
                prop_assert_eq!(sl.erase(*k), model.remove(k));
            }
            prop_assert_eq!(sl.keys_at_level(0), model.iter().copied().collect::<Vec<_>>());
            for level in 1..=sl.level() {
                let lower: BTreeSet<u32> = sl.keys_at_level(level - 1).into_iter().collect();
                for k in sl.keys_at_level(level) {
                    prop_assert!(lower.contains(&k));
                }
            }
        }

        #[test]
        fn reader_agrees_with_in_memory_search(
            keys in proptest::collection::vec(0u32..3000, 0..300),
            lookups in proptest::collection::vec(0u32..3100, 0..100),
            seed in any::<u64>(),
        ) {
            let mut sl = SkipList::with_seed(seed);
            for k in &keys {
                sl.insert(*k).unwrap();
            }
            let reader = SkipListReader::new(sl.serialize()).unwrap();
            for k in keys.iter().chain(lookups.iter()) {
                prop_assert_eq!(reader.search(*k), sl.search(*k));
            }
        }

        #[test]
        fn fast_intersection_matches_set_intersection(
            a in proptest::collection::btree_set(0u32..2000, 0..400),
            b in proptest::collection::btree_set(0u32..2000, 0..400),
            seed in any::<u64>(),
        ) {
            let ra = reader_for(a.iter().copied(), seed);
            let rb = reader_for(b.iter().copied(), seed.wrapping_add(1));
            let expected: Vec<u32> = a.intersection(&b).copied().collect();
            prop_assert_eq!(fast_posting_lists_intersection(&ra, &rb), expected);
        }
    }
}
