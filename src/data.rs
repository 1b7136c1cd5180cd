use std::path::Path;
use std::sync::Arc;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::utils::first_duplicate;

quick_error! {
    #[derive(Debug)]
    pub enum DataError {
        Io(err: std::io::Error) {
            from()
            description("I/O error")
            display("I/O error: {}", err)
        }
        Csv(err: csv::Error) {
            from()
            description("CSV error")
            display("CSV error: {}", err)
        }
        ParseFloat(err: std::num::ParseFloatError) {
            from()
            description("Invalid number")
            display("Invalid number: {}", err)
        }
        ZeroColumns {
            description("Zero columns in dataset")
        }
        ColumnCountMismatch(count: usize, previous: usize) {
            description("Invalid number of columns, did not match previous columns")
            display("Invalid number of columns {}, previous was {}", count, previous)
        }
        ColumnNotFound(name: String) {
            description("Column with specified name not found")
            display("Column with name {} not found", name)
        }
        DuplicateColumns(name: String) {
            description("Duplicate columns found in file")
            display("Duplicate columns found in file: {}", name)
        }
        InvalidLabel(value: f64) {
            description("Label is not a non-negative integer")
            display("Label {} is not a non-negative integer", value)
        }
        LabelOutOfRange(label: usize, num_labels: usize) {
            description("Label out of range")
            display("Label {} out of range for {} classes", label, num_labels)
        }
        ZeroImageSize {
            description("Image size must be positive")
        }
        ImageLabelCountMismatch(images: usize, labels: usize) {
            description("Number of images doesn't match number of labels")
            display("Number of images doesn't match number of labels ({} / {})", images, labels)
        }
    }
}

/// One labelled example. Cloning is cheap; the vectors are shared.
#[derive(Clone, Debug, PartialEq)]
pub struct DataPoint {
    inputs: Arc<[f64]>,
    expected_outputs: Arc<[f64]>,
    label: usize,
}

impl DataPoint {

    pub fn new(inputs: Vec<f64>, label: usize, num_labels: usize) -> Result<Self, DataError> {
        if label >= num_labels {
            return Err(DataError::LabelOutOfRange(label, num_labels));
        }
        Ok(DataPoint {
            inputs: inputs.into(),
            expected_outputs: create_one_hot(label, num_labels).into(),
            label,
        })
    }

    #[inline]
    pub fn inputs(&self) -> &[f64] {
        &self.inputs
    }

    #[inline]
    pub fn expected_outputs(&self) -> &[f64] {
        &self.expected_outputs
    }

    #[inline]
    pub fn label(&self) -> usize {
        self.label
    }

    #[inline]
    pub fn num_labels(&self) -> usize {
        self.expected_outputs.len()
    }

}

pub fn create_one_hot(index: usize, num: usize) -> Vec<f64> {
    let mut one_hot = vec![0.0; num];
    one_hot[index] = 1.0;
    one_hot
}

/// Fixed-size group of examples averaged into one gradient step.
#[derive(Clone, Debug)]
pub struct Batch {
    data: Vec<DataPoint>,
}

impl Batch {

    pub fn new(data: Vec<DataPoint>) -> Self {
        Batch { data }
    }

    #[inline]
    pub fn data(&self) -> &[DataPoint] {
        &self.data
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

}

/// Loads labelled examples from a CSV file with a header row. The column
/// named `label_column` holds the class index; every other column is an
/// input, multiplied by `input_scale`.
pub fn load_csv(
    path: impl AsRef<Path>,
    label_column: &str,
    num_labels: usize,
    input_scale: f64,
) -> Result<Vec<DataPoint>, DataError> {

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;

    let column_names = reader.headers()?
        .iter()
        .map(str::to_owned)
        .collect::<Vec<String>>();

    let n_cols = column_names.len();

    if n_cols == 0 {
        return Err(DataError::ZeroColumns);
    }

    if let Some(dupe) = first_duplicate(column_names.iter()) {
        return Err(DataError::DuplicateColumns(dupe.clone()));
    }

    let label_index = column_names.iter()
        .position(|n| n == label_column)
        .ok_or_else(|| DataError::ColumnNotFound(label_column.to_string()))?;

    let mut row_vals = Vec::with_capacity(n_cols);
    let mut data = Vec::new();

    for row in reader.records() {
        row_vals.clear();
        for datum in row?.iter() {
            row_vals.push(datum.parse::<f64>()?);
        }
        if n_cols != row_vals.len() {
            return Err(DataError::ColumnCountMismatch(row_vals.len(), n_cols));
        }

        let label_value = row_vals[label_index];
        if label_value < 0.0 || label_value.fract() != 0.0 {
            return Err(DataError::InvalidLabel(label_value));
        }

        let inputs = row_vals.iter()
            .enumerate()
            .filter(|&(i, _)| i != label_index)
            .map(|(_, value)| value * input_scale)
            .collect();

        data.push(DataPoint::new(inputs, label_value as usize, num_labels)?);
    }

    Ok(data)
}

/// Builds examples from raw pixel bytes (one byte per channel, images stored
/// back to back) and one label byte per image. Pixels are scaled to [0, 1].
pub fn from_raw_bytes(
    image_data: &[u8],
    label_data: &[u8],
    image_size: usize,
    greyscale: bool,
    num_labels: usize,
) -> Result<Vec<DataPoint>, DataError> {
    if image_size == 0 {
        return Err(DataError::ZeroImageSize);
    }
    let num_channels = if greyscale { 1 } else { 3 };
    let bytes_per_image = image_size * image_size * num_channels;

    let num_images = image_data.len() / bytes_per_image;
    let num_labels_in_file = label_data.len();
    if num_images != num_labels_in_file || image_data.len() % bytes_per_image != 0 {
        return Err(DataError::ImageLabelCountMismatch(num_images, num_labels_in_file));
    }

    let pixel_range_scale = 1.0 / 255.0;
    image_data.chunks_exact(bytes_per_image)
        .zip(label_data)
        .map(|(pixels, &label)| {
            let inputs = pixels.iter().map(|&p| p as f64 * pixel_range_scale).collect();
            DataPoint::new(inputs, label as usize, num_labels)
        })
        .collect()
}

pub fn load_raw_files(
    image_path: impl AsRef<Path>,
    label_path: impl AsRef<Path>,
    image_size: usize,
    greyscale: bool,
    num_labels: usize,
) -> Result<Vec<DataPoint>, DataError> {
    let image_data = std::fs::read(image_path)?;
    let label_data = std::fs::read(label_path)?;
    from_raw_bytes(&image_data, &label_data, image_size, greyscale, num_labels)
}

/// Splits `data` into training and validation partitions. The training
/// partition receives `floor(len * training_split)` points, with the split
/// clamped to [0, 1].
pub fn split_data<R: Rng + ?Sized>(
    data: &[DataPoint],
    training_split: f64,
    shuffle: bool,
    rng: &mut R,
) -> (Vec<DataPoint>, Vec<DataPoint>) {
    let mut all_data = data.to_vec();
    if shuffle {
        all_data.shuffle(rng);
    }
    let split = training_split.max(0.0).min(1.0);
    let train_count = (all_data.len() as f64 * split) as usize;
    let validation_data = all_data.split_off(train_count);
    (all_data, validation_data)
}

/// Groups `data` into batches of exactly `size` points. Points left over
/// after the last full batch are dropped.
pub fn create_mini_batches<R: Rng + ?Sized>(
    data: &[DataPoint],
    size: usize,
    shuffle: bool,
    rng: &mut R,
) -> Vec<Batch> {
    assert!(size > 0, "minibatch size must be positive");
    let mut all_data = data.to_vec();
    if shuffle {
        all_data.shuffle(rng);
    }
    all_data.chunks_exact(size)
        .map(|chunk| Batch::new(chunk.to_vec()))
        .collect()
}

pub fn shuffle_batches<R: Rng + ?Sized>(batches: &mut [Batch], rng: &mut R) {
    batches.shuffle(rng);
}
