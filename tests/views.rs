use approx::assert_relative_eq;
use proptest::prelude::*;
use strided_buffer::{
    BufferRequest, Component, ErrorKind, Owner, Size, SliceSpec, Stride, StridedArrayView,
    StridedBuffer, StridedError, Value,
};

fn floats(len: usize) -> Vec<f32> {
    (0..len).map(|i| i as f32 * 0.5).collect()
}

fn float_buffer<const D: usize>(size: Size<D>) -> StridedBuffer<D> {
    let bytes = floats(size.product())
        .iter()
        .flat_map(|v| v.to_ne_bytes())
        .collect();
    StridedBuffer::from_vec(bytes, size, Component::F32).unwrap()
}

fn as_f64(value: Value) -> f64 {
    value.as_f64().unwrap()
}

// ============================================================================
// Concrete scenarios
// ============================================================================

#[test]
fn test_slice_row_then_flip_columns() {
    let view = float_buffer(Size::new([2, 3]));
    assert_eq!(view.stride(), Stride::new([12, 4]));

    let row = view
        .slice(Size::new([1, 0]), Size::new([2, 3]))
        .unwrap()
        .flipped(1)
        .unwrap();
    assert_eq!(row.size(), Size::new([1, 3]));
    assert_relative_eq!(
        as_f64(row.get(Size::new([0, 0])).unwrap()),
        as_f64(view.get(Size::new([1, 2])).unwrap())
    );
    assert_relative_eq!(
        as_f64(row.get(Size::new([0, 2])).unwrap()),
        as_f64(view.get(Size::new([1, 0])).unwrap())
    );
}

#[test]
fn test_write_through_broadcast_fails() {
    let view = float_buffer(Size::new([1, 5]));
    let wide = view.broadcasted(0, 4).unwrap();
    assert_eq!(wide.size(), Size::new([4, 5]));
    assert_eq!(wide.stride(), Stride::new([0, 4]));

    let err = wide.set(Size::new([2, 3]), &Value::Float(1.0)).unwrap_err();
    assert!(matches!(err, StridedError::BroadcastWrite { dim: 0 }));
    assert_eq!(err.kind(), ErrorKind::Permission);
    assert_eq!(view.get(Size::new([0, 3])).unwrap(), Value::Float(1.5));
}

#[test]
fn test_import_three_dims_into_two() {
    let cube = float_buffer(Size::new([2, 2, 2]));
    let info = cube.buffer_info(BufferRequest::FULL_RO).unwrap();
    let err = StridedBuffer::<2>::from_buffer(info).unwrap_err();
    assert!(matches!(
        err,
        StridedError::BufferDimensions {
            expected: 2,
            actual: 3
        }
    ));
    assert_eq!(err.kind(), ErrorKind::Buffer);
}

// ============================================================================
// Ownership
// ============================================================================

#[test]
fn test_owner_survives_operation_chain() {
    let original = float_buffer(Size::new([4, 6]));
    let expected = original.get(Size::new([3, 1])).unwrap();

    let derived = original
        .slice(Size::new([1, 1]), Size::new([4, 5]))
        .unwrap()
        .flipped(0)
        .unwrap()
        .transposed(0, 1)
        .unwrap()
        .every(Stride::new([1, 1]))
        .unwrap();
    drop(original);

    assert_eq!(Owner::strong_count(derived.owner().unwrap()), 1);
    assert_eq!(derived.size(), Size::new([4, 3]));
    // (3, 1) in the original is row 2 of the slice, row 0 after the flip
    assert_eq!(derived.get(Size::new([0, 0])).unwrap(), expected);
    assert_eq!(derived.to_values().unwrap().len(), 12);
}

#[test]
fn test_empty_results_drop_owner() {
    let view = float_buffer(Size::new([3, 2]));
    let owner = view.owner().unwrap().clone();
    assert_eq!(Owner::strong_count(&owner), 2);

    let empty = view.slice_axis(0, 2, 2).unwrap();
    assert!(empty.owner().is_none());
    assert!(empty.is_empty());
    let none = view.sliced(0, SliceSpec::range(1, 1)).unwrap();
    assert!(none.owner().is_none());
    // an empty inner dimension addresses nothing either
    let narrow = view.slice_axis(1, 1, 1).unwrap();
    assert_eq!(narrow.size(), Size::new([3, 0]));
    assert!(narrow.owner().is_none());
    assert_eq!(Owner::strong_count(&owner), 2);
}

#[test]
fn test_external_owner_keeps_memory() {
    let storage: Vec<u16> = vec![10, 20, 30, 40];
    let data = storage.as_ptr().cast_mut().cast::<u8>();
    let owner = Owner::new(storage);
    let layout = strided_buffer::Layout::contiguous(Size::new([4]), 2);
    // SAFETY: the Vec's heap allocation doesn't move when the Vec is moved
    // into the owner, and the view only reads
    let view = unsafe {
        StridedBuffer::from_raw_parts(data, layout, Component::U16.accessor(1), false, Some(owner))
    };
    let reversed = view.flipped(0).unwrap();
    drop(view);
    assert_eq!(reversed.get(Size::new([0])).unwrap(), Value::Int(40));
    assert_eq!(
        reversed.owner().unwrap().downcast_ref::<Vec<u16>>(),
        Some(&vec![10, 20, 30, 40])
    );
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_error_kinds() {
    let view = float_buffer(Size::new([2, 3]));
    let kind = |r: Result<StridedBuffer<2>, StridedError>| r.unwrap_err().kind();

    assert_eq!(kind(view.slice_axis(1, 2, 4)), ErrorKind::Bounds);
    assert_eq!(kind(view.flipped(2)), ErrorKind::Dimension);
    assert_eq!(kind(view.broadcasted(1, 6)), ErrorKind::Precondition);
    assert_eq!(kind(view.every(Stride::new([0, 1]))), ErrorKind::Precondition);
    assert_eq!(
        view.get(Size::new([2, 0])).unwrap_err().kind(),
        ErrorKind::Bounds
    );
    assert_eq!(
        view.read_only()
            .set(Size::new([0, 0]), &Value::Float(0.0))
            .unwrap_err()
            .kind(),
        ErrorKind::Permission
    );
    assert_eq!(
        view.set(Size::new([0, 0]), &Value::Floats([1.0, 2.0].into_iter().collect()))
            .unwrap_err()
            .kind(),
        ErrorKind::Value
    );
}

#[test]
fn test_slice_rejects_zero_and_contradictory_steps() {
    let view = float_buffer(Size::new([5, 1]));
    assert!(matches!(
        view.sliced(0, SliceSpec::step(0)),
        Err(StridedError::InvalidSlice { step: 0, .. })
    ));
    assert!(matches!(
        view.sliced(0, SliceSpec::range(4, 1)),
        Err(StridedError::InvalidSlice { .. })
    ));
    assert!(matches!(
        view.sliced(0, SliceSpec::new(Some(1), Some(4), Some(-1))),
        Err(StridedError::InvalidSlice { .. })
    ));

    let tail = view.sliced(0, SliceSpec::new(Some(-1), None, Some(-2))).unwrap();
    let values: Vec<f64> = tail.to_values().unwrap().into_iter().map(as_f64).collect();
    assert_eq!(values, vec![2.0, 1.0, 0.0]);
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_slice_round_trip(len in 1usize..40, a in 0usize..40, b in 0usize..40) {
        let data = floats(len);
        let view = StridedArrayView::contiguous(&data, Size::new([len])).unwrap();
        let (a, b) = (a.min(b).min(len), a.max(b).min(len));
        let sliced = view.slice(Size::new([a]), Size::new([b])).unwrap();
        prop_assert_eq!(sliced.len(), b - a);
        for i in 0..b - a {
            prop_assert_eq!(sliced.get(Size::new([i])).unwrap(), data[a + i]);
        }
    }

    #[test]
    fn prop_flip_involution(rows in 1usize..6, cols in 1usize..6, axis in 0usize..2) {
        let data = floats(rows * cols);
        let view = StridedArrayView::contiguous(&data, Size::new([rows, cols])).unwrap();
        let twice = view.flipped(axis).unwrap().flipped(axis).unwrap();
        prop_assert_eq!(twice.data(), view.data());
        prop_assert_eq!(twice.stride(), view.stride());
        prop_assert_eq!(twice.to_vec(), view.to_vec());
    }

    #[test]
    fn prop_broadcast_aliases(cols in 1usize..8, n in 1usize..8) {
        let data = floats(cols);
        let view = StridedArrayView::contiguous(&data, Size::new([1, cols])).unwrap();
        let wide = view.broadcasted(0, n).unwrap();
        for i in 0..n {
            for j in 0..cols {
                let got = wide.get(Size::new([i, j])).unwrap();
                prop_assert_eq!(got.to_bits(), data[j].to_bits());
            }
        }
    }

    #[test]
    fn prop_transpose_self_inverse(d0 in 1usize..4, d1 in 1usize..4, d2 in 1usize..4, a in 0usize..3, b in 0usize..3) {
        let data = floats(d0 * d1 * d2);
        let view = StridedArrayView::contiguous(&data, Size::new([d0, d1, d2])).unwrap();
        let back = view.transposed(a, b).unwrap().transposed(a, b).unwrap();
        prop_assert_eq!(back.size(), view.size());
        prop_assert_eq!(back.stride(), view.stride());
        prop_assert_eq!(back.to_vec(), view.to_vec());
    }

    #[test]
    fn prop_expand_preserves_order(rows in 1usize..4, n1 in 1usize..5, n2 in 1usize..5, flip in any::<bool>()) {
        let data = floats(rows * n1 * n2);
        let mut view = StridedArrayView::contiguous(&data, Size::new([rows, n1 * n2])).unwrap();
        if flip {
            view = view.flipped(1).unwrap();
        }
        let expanded = view.expanded::<2, 3>(1, Size::new([n1, n2])).unwrap();
        prop_assert_eq!(expanded.size(), Size::new([rows, n1, n2]));
        prop_assert_eq!(expanded.to_vec(), view.to_vec());
        let collapsed = expanded.collapsed::<2>(1).unwrap();
        prop_assert_eq!(collapsed.stride(), view.stride());
    }

    #[test]
    fn prop_buffer_round_trip(rows in 1usize..5, cols in 1usize..5, flip in any::<bool>(), transpose in any::<bool>()) {
        let mut view = float_buffer(Size::new([rows, cols]));
        if flip {
            view = view.flipped(0).unwrap();
        }
        if transpose {
            view = view.transposed(0, 1).unwrap();
        }
        let info = view.buffer_info(BufferRequest::FULL_RO).unwrap();
        let back = StridedBuffer::<2>::from_buffer(info).unwrap();
        prop_assert_eq!(back.size(), view.size());
        prop_assert_eq!(back.stride(), view.stride());
        prop_assert_eq!(back.item_size(), view.item_size());
        prop_assert_eq!(back.format(), Some("f"));
        prop_assert_eq!(back.to_values().unwrap(), view.to_values().unwrap());
    }
}
