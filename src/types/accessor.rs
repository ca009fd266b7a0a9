//! Typed channel reads from the sample table

use super::{Value, VariableDescriptor, VariableType};

/// Random access to channel values across the samples of one capture.
///
/// Reads never fail loudly: a position outside the buffer (a truncated tail,
/// a descriptor offset larger than the stride) decodes to `None`.
#[derive(Debug, Clone, Copy)]
pub struct SampleAccessor<'a> {
    data: &'a [u8],
    first_sample: usize,
    stride: usize,
    sample_count: usize,
}

impl<'a> SampleAccessor<'a> {
    pub fn new(data: &'a [u8], first_sample: usize, stride: usize, sample_count: usize) -> Self {
        Self { data, first_sample, stride, sample_count }
    }

    /// Number of whole samples in the table.
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Absolute byte position of a sample's first byte.
    pub fn sample_base(&self, sample_index: usize) -> Option<usize> {
        sample_index.checked_mul(self.stride)?.checked_add(self.first_sample)
    }

    /// Decode `descriptor` at `sample_index`.
    pub fn read(&self, descriptor: &VariableDescriptor, sample_index: usize) -> Option<Value> {
        let pos = self.sample_base(sample_index)?.checked_add(descriptor.offset)?;
        decode(self.data, pos, descriptor.data_type)
    }

    /// Convenience read for an optional descriptor, widened to f64.
    pub fn read_f64(
        &self,
        descriptor: Option<&VariableDescriptor>,
        sample_index: usize,
    ) -> Option<f64> {
        descriptor.and_then(|d| self.read(d, sample_index)).map(Value::as_f64)
    }

    /// Convenience read for an optional descriptor as an integer.
    pub fn read_i32(
        &self,
        descriptor: Option<&VariableDescriptor>,
        sample_index: usize,
    ) -> Option<i32> {
        descriptor.and_then(|d| self.read(d, sample_index)).map(Value::as_i32)
    }
}

fn decode(data: &[u8], pos: usize, data_type: VariableType) -> Option<Value> {
    let end = pos.checked_add(data_type.size())?;
    let bytes = data.get(pos..end)?;
    Some(match data_type {
        VariableType::Int32 => Value::Int32(i32::from_le_bytes(bytes.try_into().ok()?)),
        VariableType::Float32 => Value::Float32(f32::from_le_bytes(bytes.try_into().ok()?)),
        VariableType::Float64 => Value::Float64(f64::from_le_bytes(bytes.try_into().ok()?)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn two_sample_buffer() -> Vec<u8> {
        // 8 bytes of prefix, then two 16-byte samples: i32 @0, f32 @4, f64 @8
        let mut data = vec![0xAAu8; 8];
        for (lap, pct, time) in [(3i32, 0.25f32, 41.5f64), (4, 0.5, 83.25)] {
            data.extend_from_slice(&lap.to_le_bytes());
            data.extend_from_slice(&pct.to_le_bytes());
            data.extend_from_slice(&time.to_le_bytes());
        }
        data
    }

    #[test]
    fn reads_each_type_at_each_sample() {
        let data = two_sample_buffer();
        let accessor = SampleAccessor::new(&data, 8, 16, 2);
        let lap = VariableDescriptor::new("Lap", VariableType::Int32, 0);
        let pct = VariableDescriptor::new("LapDistPct", VariableType::Float32, 4);
        let time = VariableDescriptor::new("SessionTime", VariableType::Float64, 8);

        assert_eq!(accessor.read(&lap, 0), Some(Value::Int32(3)));
        assert_eq!(accessor.read(&pct, 0), Some(Value::Float32(0.25)));
        assert_eq!(accessor.read(&time, 1), Some(Value::Float64(83.25)));
        assert_eq!(accessor.read_i32(Some(&lap), 1), Some(4));
        assert_eq!(accessor.read_f64(None, 1), None);
    }

    #[test]
    fn reads_past_the_end_are_unavailable() {
        let data = two_sample_buffer();
        let accessor = SampleAccessor::new(&data, 8, 16, 2);
        let time = VariableDescriptor::new("SessionTime", VariableType::Float64, 8);
        let overhanging = VariableDescriptor::new("Wide", VariableType::Float64, 12);

        assert_eq!(accessor.read(&time, 2), None);
        assert_eq!(accessor.read(&overhanging, 1), None);
        assert_eq!(accessor.read(&time, usize::MAX), None);
    }

    proptest! {
        #[test]
        fn prop_f32_reads_return_written_value(value in any::<f32>(), offset in 0..64usize) {
            let mut data = vec![0u8; 72];
            data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
            let accessor = SampleAccessor::new(&data, 0, 72, 1);
            let descriptor = VariableDescriptor::new("V", VariableType::Float32, offset);
            match accessor.read(&descriptor, 0) {
                Some(Value::Float32(read)) => {
                    prop_assert!(read.to_bits() == value.to_bits());
                }
                other => prop_assert!(false, "unexpected read {:?}", other),
            }
        }

        #[test]
        fn prop_reads_never_panic(len in 0..256usize, base in 0..512usize, stride in 1..64usize,
                                  index in 0..64usize, offset in 0..128usize) {
            let data = vec![1u8; len];
            let accessor = SampleAccessor::new(&data, base, stride, 0);
            let descriptor = VariableDescriptor::new("V", VariableType::Float64, offset);
            let result = accessor.read(&descriptor, index);
            let pos = base + index * stride + offset;
            prop_assert_eq!(result.is_some(), pos + 8 <= len);
        }
    }
}
