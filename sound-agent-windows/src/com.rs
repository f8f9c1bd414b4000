use windows::Win32::System::Com::{
    CoInitializeEx, CoUninitialize, COINIT, COINIT_APARTMENTTHREADED, COINIT_DISABLE_OLE1DDE,
    COINIT_MULTITHREADED,
};

/// Threading model requested for the calling thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApartmentModel {
    MultiThreaded,
    ApartmentThreaded,
}

/// COM initialized on the current thread for as long as the guard lives.
///
/// `CoUninitialize` runs on drop only if `CoInitializeEx` succeeded, so a
/// thread already in an incompatible apartment is left untouched. Not `Send`:
/// the guard must drop on the thread that created it.
pub struct ComApartment {
    initialized: bool,
    _not_send: std::marker::PhantomData<*const ()>,
}

impl ComApartment {
    pub fn new(model: ApartmentModel) -> Self {
        let threading = match model {
            ApartmentModel::MultiThreaded => COINIT_MULTITHREADED,
            ApartmentModel::ApartmentThreaded => COINIT_APARTMENTTHREADED,
        };
        let hr = unsafe { CoInitializeEx(None, COINIT(threading.0 | COINIT_DISABLE_OLE1DDE.0)) };
        if hr.is_err() {
            log::warn!("CoInitializeEx({:?}) failed: {}", model, hr);
        }
        Self {
            initialized: hr.is_ok(),
            _not_send: std::marker::PhantomData,
        }
    }

    pub fn multithreaded() -> Self {
        Self::new(ApartmentModel::MultiThreaded)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

impl Drop for ComApartment {
    fn drop(&mut self) {
        if self.initialized {
            unsafe {
                CoUninitialize();
            }
        }
    }
}
