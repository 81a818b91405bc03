//! Frame layers and layout construction

use super::{ChecksumAlg, Endian, LayoutError, MAX_INT_WIDTH};

/// One element of a frame layout, in wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layer {
    /// Fixed synchronization prefix.
    Sync(Vec<u8>),
    /// Number of bytes following this field up to the end of the frame.
    Size {
        /// Width in bytes
        width: usize,
        /// Byte order
        endian: Endian,
        /// Added to the actual size on the wire
        offset: i64,
    },
    /// Message id.
    Id {
        /// Width in bytes
        width: usize,
        /// Byte order
        endian: Endian,
    },
    /// Transport value exchanged with the message by index.
    Value {
        /// Transport field index
        index: usize,
        /// Width in bytes
        width: usize,
        /// Byte order
        endian: Endian,
        /// Value assumed on read instead of a serialized one; nothing is
        /// written for pseudo values.
        pseudo: Option<u64>,
    },
    /// Message payload.
    Payload,
    /// Checksum over the bytes from layer `from` up to this layer.
    Checksum {
        /// Algorithm
        alg: ChecksumAlg,
        /// Width in bytes
        width: usize,
        /// Byte order
        endian: Endian,
        /// Index of the first covered layer
        from: usize,
        /// Verify before decoding the payload, when the frame extent is
        /// known.
        verify_before_read: bool,
    },
    /// Checksum whose algorithm and width follow transport value `index`.
    SelectedChecksum {
        /// Selecting transport value index
        index: usize,
        /// `(value, algorithm, width)` choices
        choices: Vec<(u64, ChecksumAlg, usize)>,
        /// Byte order
        endian: Endian,
        /// Index of the first covered layer
        from: usize,
    },
}

impl Layer {
    /// Serialized width of layers that do not depend on the message.
    #[must_use]
    pub fn fixed_len(&self) -> Option<usize> {
        match self {
            Self::Sync(pattern) => Some(pattern.len()),
            Self::Size { width, .. } | Self::Id { width, .. } | Self::Checksum { width, .. } => {
                Some(*width)
            }
            Self::Value { pseudo: Some(_), .. } => Some(0),
            Self::Value { width, .. } => Some(*width),
            Self::Payload | Self::SelectedChecksum { .. } => None,
        }
    }

    /// Algorithm and width of a checksum layer. `selector` is the transport
    /// value a selected checksum is chosen by.
    #[must_use]
    pub fn checksum_for(&self, selector: Option<u64>) -> Option<(ChecksumAlg, usize)> {
        match self {
            Self::Checksum { alg, width, .. } => Some((*alg, *width)),
            Self::SelectedChecksum { choices, .. } => {
                let selector = selector?;
                choices
                    .iter()
                    .find(|(value, ..)| *value == selector)
                    .map(|&(_, alg, width)| (alg, width))
            }
            _ => None,
        }
    }

    /// Serialized width once the transport values are known; a selected
    /// checksum with no match counts as its narrowest choice.
    fn len_with(&self, value_of: &impl Fn(usize) -> Option<u64>) -> usize {
        match self {
            Self::SelectedChecksum { index, choices, .. } => self
                .checksum_for(value_of(*index))
                .map(|(_, width)| width)
                .or_else(|| choices.iter().map(|&(.., width)| width).min())
                .unwrap_or(0),
            _ => self.fixed_len().unwrap_or(0),
        }
    }

    fn widths(&self) -> Vec<usize> {
        match self {
            Self::Size { width, .. }
            | Self::Id { width, .. }
            | Self::Value { width, .. }
            | Self::Checksum { width, .. } => vec![*width],
            Self::SelectedChecksum { choices, .. } => {
                choices.iter().map(|&(.., width)| width).collect()
            }
            Self::Sync(_) | Self::Payload => Vec::new(),
        }
    }
}

/// Validated list of layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameLayout {
    layers: Vec<Layer>,
    payload: usize,
}

impl FrameLayout {
    /// Layers in wire order.
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Index of the payload layer.
    #[must_use]
    pub const fn payload_index(&self) -> usize {
        self.payload
    }

    /// Bytes taken by the layers after the payload, selected checksums
    /// counted at their narrowest.
    #[must_use]
    pub fn trailer_len(&self) -> usize {
        self.len_after(self.payload, |_| None)
    }

    /// Bytes taken by the layers following `index`, payload excluded, with
    /// `value_of` giving the transport values known so far.
    pub(crate) fn len_after(&self, index: usize, value_of: impl Fn(usize) -> Option<u64>) -> usize {
        self.layers[index + 1..]
            .iter()
            .map(|layer| layer.len_with(&value_of))
            .sum()
    }
}

/// Builder for [`FrameLayout`].
///
/// Numeric layers added through the shorthand methods use the builder's
/// current byte order, little-endian unless changed with
/// [`endian`](Self::endian).
///
/// ```
/// use fieldwire::{ChecksumAlg, FrameBuilder};
///
/// let layout = FrameBuilder::new()
///     .sync(&[0xAB, 0xCD])
///     .size(2)
///     .id(1)
///     .payload()
///     .checksum(ChecksumAlg::Crc16, 1)
///     .build()?;
/// assert_eq!(layout.layers().len(), 5);
/// # Ok::<(), fieldwire::LayoutError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct FrameBuilder {
    layers: Vec<Layer>,
    endian: Endian,
}

impl FrameBuilder {
    /// Empty layout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Byte order for the numeric layers added next.
    #[must_use]
    pub fn endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    /// Append an arbitrary layer.
    #[must_use]
    pub fn layer(mut self, layer: Layer) -> Self {
        self.layers.push(layer);
        self
    }

    /// Append a sync prefix.
    #[must_use]
    pub fn sync(self, pattern: &[u8]) -> Self {
        self.layer(Layer::Sync(pattern.to_vec()))
    }

    /// Append a size field of `width` bytes.
    #[must_use]
    pub fn size(self, width: usize) -> Self {
        self.size_with_offset(width, 0)
    }

    /// Append a size field whose wire value is the size plus `offset`.
    #[must_use]
    pub fn size_with_offset(self, width: usize, offset: i64) -> Self {
        let endian = self.endian;
        self.layer(Layer::Size {
            width,
            endian,
            offset,
        })
    }

    /// Append the message id.
    #[must_use]
    pub fn id(self, width: usize) -> Self {
        let endian = self.endian;
        self.layer(Layer::Id { width, endian })
    }

    /// Append transport value `index`.
    #[must_use]
    pub fn value(self, index: usize, width: usize) -> Self {
        let endian = self.endian;
        self.layer(Layer::Value {
            index,
            width,
            endian,
            pseudo: None,
        })
    }

    /// Append transport value `index` that is never serialized and always
    /// reads as `value`.
    #[must_use]
    pub fn pseudo_value(self, index: usize, width: usize, value: u64) -> Self {
        let endian = self.endian;
        self.layer(Layer::Value {
            index,
            width,
            endian,
            pseudo: Some(value),
        })
    }

    /// Append the payload.
    #[must_use]
    pub fn payload(self) -> Self {
        self.layer(Layer::Payload)
    }

    /// Append a checksum in the algorithm's natural width covering layers
    /// `from` onwards.
    #[must_use]
    pub fn checksum(self, alg: ChecksumAlg, from: usize) -> Self {
        let endian = self.endian;
        self.layer(Layer::Checksum {
            alg,
            width: alg.natural_width(),
            endian,
            from,
            verify_before_read: false,
        })
    }

    /// Like [`checksum`](Self::checksum), but verified before the payload is
    /// decoded.
    #[must_use]
    pub fn checksum_verified_first(self, alg: ChecksumAlg, from: usize) -> Self {
        let endian = self.endian;
        self.layer(Layer::Checksum {
            alg,
            width: alg.natural_width(),
            endian,
            from,
            verify_before_read: true,
        })
    }

    /// Append a checksum covering layers `from` onwards whose algorithm is
    /// chosen by transport value `index`, each in its natural width. The
    /// value layer must precede the payload.
    #[must_use]
    pub fn selected_checksum(
        self,
        index: usize,
        choices: &[(u64, ChecksumAlg)],
        from: usize,
    ) -> Self {
        let endian = self.endian;
        self.layer(Layer::SelectedChecksum {
            index,
            choices: choices
                .iter()
                .map(|&(value, alg)| (value, alg, alg.natural_width()))
                .collect(),
            endian,
            from,
        })
    }

    /// Validate and finish the layout.
    pub fn build(self) -> Result<FrameLayout, LayoutError> {
        let ids: Vec<usize> = positions(&self.layers, |l| matches!(l, Layer::Id { .. }));
        if ids.len() != 1 {
            return Err(LayoutError::IdLayerCount(ids.len()));
        }
        let payloads: Vec<usize> = positions(&self.layers, |l| matches!(l, Layer::Payload));
        if payloads.len() != 1 {
            return Err(LayoutError::PayloadLayerCount(payloads.len()));
        }
        let payload = payloads[0];
        if ids[0] > payload {
            return Err(LayoutError::IdAfterPayload(ids[0]));
        }

        for (index, layer) in self.layers.iter().enumerate() {
            for width in layer.widths() {
                if width == 0 || width > MAX_INT_WIDTH {
                    return Err(LayoutError::InvalidWidth {
                        layer: index,
                        width,
                    });
                }
            }
            match layer {
                Layer::Sync(pattern) if pattern.is_empty() => {
                    return Err(LayoutError::EmptySync(index));
                }
                Layer::Size { .. } if index > payload => {
                    return Err(LayoutError::SizeAfterPayload(index));
                }
                Layer::Checksum { from, .. } | Layer::SelectedChecksum { from, .. }
                    if *from >= index =>
                {
                    return Err(LayoutError::InvalidChecksumRange {
                        layer: index,
                        from: *from,
                    });
                }
                Layer::SelectedChecksum {
                    index: selector,
                    choices,
                    ..
                } => {
                    let bound = self.layers[..payload].iter().any(
                        |l| matches!(l, Layer::Value { index: value, .. } if value == selector),
                    );
                    if choices.is_empty() || !bound {
                        return Err(LayoutError::UnboundChecksumSelector {
                            layer: index,
                            index: *selector,
                        });
                    }
                }
                _ => {}
            }
        }

        Ok(FrameLayout {
            layers: self.layers,
            payload,
        })
    }
}

fn positions(layers: &[Layer], pred: impl Fn(&Layer) -> bool) -> Vec<usize> {
    layers
        .iter()
        .enumerate()
        .filter(|(_, layer)| pred(layer))
        .map(|(index, _)| index)
        .collect()
}
