pub(crate) mod image_codec;
