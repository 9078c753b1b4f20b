use burn::tensor::{backend::Backend, Data, ElementConversion, Int, Shape, Tensor};

/// Stack equally long rows of ids into a `[rows, seq_length]` integer tensor
pub fn stack_rows<'a, B: Backend>(
    rows: impl IntoIterator<Item = &'a [u32]>,
    seq_length: usize,
    device: &B::Device,
) -> Tensor<B, 2, Int> {
    let mut values: Vec<B::IntElem> = Vec::new();
    let mut n_rows = 0;

    for row in rows {
        debug_assert_eq!(row.len(), seq_length, "rows must share one sequence length");

        values.extend(row.iter().map(|&v| (v as i64).elem::<B::IntElem>()));
        n_rows += 1;
    }

    Tensor::from_data(Data::new(values, Shape::new([n_rows, seq_length])), device)
}

/// Build a 1D integer tensor from class ids
pub fn class_ids<B: Backend>(
    ids: impl IntoIterator<Item = u8>,
    device: &B::Device,
) -> Tensor<B, 1, Int> {
    let values: Vec<B::IntElem> = ids.into_iter().map(|id| (id as i64).elem()).collect();
    let n = values.len();

    Tensor::from_data(Data::new(values, Shape::new([n])), device)
}

/// Read a float tensor back into host memory
pub fn to_vec<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Vec<f32> {
    tensor.into_data().convert::<f32>().value
}
