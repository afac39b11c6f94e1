use crate::tensor::Tensor;

/// One entry of the network's flat parameter/gradient view: a named,
/// mutable parameter tensor zipped with its freshly collected gradient.
/// The key scheme is identical on both sides, so optimizers can walk the
/// entries without any per-layer knowledge.
pub struct ParamGrad<'a, T> {
    pub key: &'static str,
    pub param: &'a mut Tensor<T>,
    pub grad: &'a Tensor<T>,
}

#[cfg(feature = "serde")]
mod persist {
    use crate::error::Error;
    use crate::math::DTypeOps;
    use crate::net::ConvNet;
    use crate::tensor::Tensor;
    use std::collections::BTreeMap;
    use std::fs::File;
    use std::io::{self, BufReader, BufWriter};
    use std::path::Path;

    impl<T> ConvNet<T>
    where
        T: DTypeOps + serde::Serialize + serde::de::DeserializeOwned,
    {
        /// Write the flat parameter mapping as JSON. Gradients, caches and
        /// optimizer state are not part of the snapshot.
        pub fn save_params<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
            let map: BTreeMap<&str, &Tensor<T>> = self.params().into_iter().collect();
            let file = BufWriter::new(File::create(path)?);
            serde_json::to_writer(file, &map)?;
            Ok(())
        }

        /// Load a parameter snapshot written by [`Self::save_params`] and
        /// rebind every layer's weight/bias storage to the loaded tensors.
        pub fn load_params<P: AsRef<Path>>(&mut self, path: P) -> io::Result<()> {
            let file = BufReader::new(File::open(path)?);
            let saved: BTreeMap<String, Tensor<T>> = serde_json::from_reader(file)?;
            self.bind_params(saved)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
        }
    }

    impl<T: DTypeOps> ConvNet<T> {
        /// Replace every parameter tensor with its entry from `saved`.
        /// Fails on a missing key or a shape mismatch; parameter shapes are
        /// fixed at construction and a snapshot cannot change them.
        pub fn bind_params(&mut self, mut saved: BTreeMap<String, Tensor<T>>) -> Result<(), Error> {
            for entry in self.params_and_grads() {
                let loaded = saved
                    .remove(entry.key)
                    .ok_or_else(|| Error::MissingParam(entry.key.to_string()))?;
                if loaded.len() != loaded.dims().size() {
                    return Err(Error::shape(
                        "parameter snapshot",
                        format!("{} carries {} values for dims {}", entry.key, loaded.len(), loaded.dims()),
                    ));
                }
                if loaded.dims() != entry.param.dims() {
                    return Err(Error::shape(
                        "parameter snapshot",
                        format!(
                            "{} has dims {}, expected {}",
                            entry.key,
                            loaded.dims(),
                            entry.param.dims()
                        ),
                    ));
                }
                *entry.param = loaded;
            }
            Ok(())
        }
    }
}
