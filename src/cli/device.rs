use burn::backend::libtorch::LibTorchDevice;

/// Device Error
#[derive(thiserror::Error, Debug)]
pub enum DeviceError {
    /// CUDA was requested but LibTorch cannot see a GPU
    #[error("CUDA is not available; pass --cpu to train on the CPU instead")]
    CudaUnavailable,
}

/// Pick the LibTorch device for a run: the first CUDA device unless `cpu` is set
pub fn select(cpu: bool) -> Result<LibTorchDevice, DeviceError> {
    if cpu {
        return Ok(LibTorchDevice::Cpu);
    }

    if tch::Cuda::is_available() {
        Ok(LibTorchDevice::Cuda(0))
    } else {
        Err(DeviceError::CudaUnavailable)
    }
}
