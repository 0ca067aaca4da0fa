//! Bitmap-slotted heap page.
//!
//! Layout of a page of `page_size` bytes holding tuples of `tuple_size` bytes:
//!
//! ```text
//! [header: header_size bytes][slot 0]...[slot num_slots-1][zero padding]
//! ```
//!
//! Header bit `i` (bit `i % 8` of byte `i / 8`, LSB first) is set iff slot `i`
//! is occupied. Empty slots are written as zeros.

use crate::access::{RecordId, Tuple, TupleDesc};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::PageId;
use crate::transaction::TransactionId;
use bytes::{BufMut, Bytes, BytesMut};
use std::io::Cursor;
use std::sync::Arc;

/// Size arithmetic for one page size and tuple size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotLayout {
    pub page_size: usize,
    pub tuple_size: usize,
    pub num_slots: usize,
    pub header_size: usize,
}

impl SlotLayout {
    pub fn new(page_size: usize, tuple_size: usize) -> Self {
        // Each slot costs tuple_size bytes plus one header bit.
        let num_slots = page_size * 8 / (tuple_size * 8 + 1);
        Self {
            page_size,
            tuple_size,
            num_slots,
            header_size: num_slots.div_ceil(8),
        }
    }

    /// Trailing zero bytes after the last slot.
    pub fn padding(&self) -> usize {
        self.page_size - self.header_size - self.num_slots * self.tuple_size
    }

    fn slot_offset(&self, slot: usize) -> usize {
        self.header_size + slot * self.tuple_size
    }
}

/// All-zero image of an empty page.
pub fn empty_page_data(page_size: usize) -> Vec<u8> {
    vec![0u8; page_size]
}

/// Decoded heap page: header bitmap plus one optional tuple per slot.
#[derive(Debug, Clone)]
pub struct HeapPage {
    pid: PageId,
    desc: Arc<TupleDesc>,
    layout: SlotLayout,
    header: Vec<u8>,
    tuples: Vec<Option<Tuple>>,
    dirtied_by: Option<TransactionId>,
    before_image: Bytes,
}

impl HeapPage {
    /// Decode a page image. The page size is `data.len()`.
    pub fn decode(pid: PageId, data: &[u8], desc: Arc<TupleDesc>) -> StorageResult<Self> {
        let layout = SlotLayout::new(data.len(), desc.size());
        if layout.num_slots == 0 {
            return Err(StorageError::InvalidSchema(format!(
                "a {}-byte tuple does not fit in a {}-byte page",
                layout.tuple_size, layout.page_size
            )));
        }

        let header = data[..layout.header_size].to_vec();
        if let Some(stray) = (layout.num_slots..layout.header_size * 8).find(|&i| bit(&header, i)) {
            return Err(StorageError::corrupt(
                pid,
                format!("header bit {} set past the last slot", stray),
            ));
        }

        let mut tuples = Vec::with_capacity(layout.num_slots);
        for slot in 0..layout.num_slots {
            if !bit(&header, slot) {
                // Contents of an empty slot are ignored.
                tuples.push(None);
                continue;
            }
            let start = layout.slot_offset(slot);
            let mut reader = Cursor::new(&data[start..start + layout.tuple_size]);
            let mut fields = Vec::with_capacity(desc.num_fields());
            for field_type in desc.types() {
                let value = field_type
                    .read_value(&mut reader)
                    .map_err(|e| StorageError::corrupt(pid, format!("slot {}: {}", slot, e)))?;
                fields.push(value);
            }
            tuples.push(Some(Tuple::from_parts(
                desc.clone(),
                fields,
                Some(RecordId::new(pid, slot)),
            )));
        }

        Ok(Self {
            pid,
            desc,
            layout,
            header,
            tuples,
            dirtied_by: None,
            before_image: Bytes::copy_from_slice(data),
        })
    }

    /// A page with every slot empty.
    pub fn empty(pid: PageId, desc: Arc<TupleDesc>, page_size: usize) -> StorageResult<Self> {
        Self::decode(pid, &empty_page_data(page_size), desc)
    }

    /// Encode to exactly `page_size` bytes.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.layout.page_size);
        buf.put_slice(&self.header);
        for (slot, tuple) in self.tuples.iter().enumerate() {
            match tuple {
                Some(tuple) if self.is_slot_used(slot) => tuple.write_to(&mut buf),
                _ => buf.put_bytes(0, self.layout.tuple_size),
            }
        }
        buf.put_bytes(0, self.layout.padding());
        buf.freeze()
    }

    pub fn page_id(&self) -> PageId {
        self.pid
    }

    pub fn desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    pub fn layout(&self) -> SlotLayout {
        self.layout
    }

    pub fn num_slots(&self) -> usize {
        self.layout.num_slots
    }

    pub fn header(&self) -> &[u8] {
        &self.header
    }

    pub fn is_slot_used(&self, slot: usize) -> bool {
        slot < self.layout.num_slots && bit(&self.header, slot)
    }

    /// Set or clear the occupancy bit of `slot`. Clearing also drops the
    /// slot's tuple. No other bit is touched.
    pub fn set_slot_used(&mut self, slot: usize, used: bool) -> StorageResult<()> {
        if slot >= self.layout.num_slots {
            return Err(StorageError::SlotOutOfRange {
                slot,
                num_slots: self.layout.num_slots,
            });
        }
        let mask = 1u8 << (slot % 8);
        if used {
            self.header[slot / 8] |= mask;
        } else {
            self.header[slot / 8] &= !mask;
            self.tuples[slot] = None;
        }
        Ok(())
    }

    pub fn count_empty_slots(&self) -> usize {
        let used: u32 = self.header.iter().map(|b| b.count_ones()).sum();
        self.layout.num_slots - used as usize
    }

    /// Place `tuple` in the lowest free slot and assign its record id.
    pub fn insert_tuple(&mut self, tuple: &mut Tuple) -> StorageResult<RecordId> {
        if **tuple.desc() != *self.desc {
            return Err(StorageError::SchemaMismatch {
                expected: self.desc.to_string(),
                actual: tuple.desc().to_string(),
            });
        }
        let slot = (0..self.layout.num_slots)
            .find(|&slot| !self.is_slot_used(slot))
            .ok_or(StorageError::PageFull(self.pid))?;

        let record_id = RecordId::new(self.pid, slot);
        tuple.set_record_id(Some(record_id));
        self.tuples[slot] = Some(tuple.clone());
        self.set_slot_used(slot, true)?;
        Ok(record_id)
    }

    /// Clear the slot named by `tuple`'s record id.
    pub fn delete_tuple(&mut self, tuple: &Tuple) -> StorageResult<()> {
        let record_id = tuple.record_id().ok_or(StorageError::MissingRecordId)?;
        if record_id.page_id != self.pid {
            return Err(StorageError::NotOnPage(record_id.page_id));
        }
        if record_id.slot >= self.layout.num_slots {
            return Err(StorageError::SlotOutOfRange {
                slot: record_id.slot,
                num_slots: self.layout.num_slots,
            });
        }
        if !self.is_slot_used(record_id.slot) {
            return Err(StorageError::SlotAlreadyEmpty {
                page_id: self.pid,
                slot: record_id.slot,
            });
        }
        self.set_slot_used(record_id.slot, false)
    }

    pub fn tuple_at(&self, slot: usize) -> Option<&Tuple> {
        if self.is_slot_used(slot) {
            self.tuples[slot].as_ref()
        } else {
            None
        }
    }

    pub fn next_used_slot(&self, from: usize) -> Option<usize> {
        (from..self.layout.num_slots).find(|&slot| self.is_slot_used(slot))
    }

    /// Occupied tuples in slot order.
    pub fn tuples(&self) -> impl Iterator<Item = &Tuple> + '_ {
        (0..self.layout.num_slots).filter_map(move |slot| self.tuple_at(slot))
    }

    pub fn mark_dirty(&mut self, txn: Option<TransactionId>) {
        self.dirtied_by = txn;
    }

    pub fn dirtied_by(&self) -> Option<TransactionId> {
        self.dirtied_by
    }

    pub fn is_dirty(&self) -> bool {
        self.dirtied_by.is_some()
    }

    /// The page as it was when loaded (or at the last `set_before_image`).
    ///
    /// Nothing in the storage core reads this yet; it is kept for a future
    /// recovery path.
    pub fn before_image(&self) -> StorageResult<HeapPage> {
        HeapPage::decode(self.pid, &self.before_image, self.desc.clone())
    }

    pub fn set_before_image(&mut self) {
        self.before_image = self.encode();
    }
}

fn bit(header: &[u8], i: usize) -> bool {
    header[i / 8] & (1 << (i % 8)) != 0
}
