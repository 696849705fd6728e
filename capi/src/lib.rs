use c_fixed_string::CFixedStr;
use huqie::Huqie;
use std::os::raw::c_char;
use std::path::PathBuf;
use std::{mem, ptr};

/// Opaque analyzer handle. Created with a resource root, loaded lazily by
/// [`huqie_load`].
pub struct CHuqie {
    root: PathBuf,
    analyzer: Option<Huqie>,
}

/// Represents a string.
#[repr(C)]
pub struct FfiStr {
    pub data: *mut c_char,
    pub len: usize,
    pub owned: bool,
}

impl Default for FfiStr {
    fn default() -> Self {
        Self {
            data: ptr::null_mut(),
            len: 0,
            owned: false,
        }
    }
}

impl FfiStr {
    pub fn from_string(mut s: String) -> Self {
        s.shrink_to_fit();
        let rv = Self {
            data: s.as_ptr() as *mut c_char,
            len: s.len(),
            owned: true,
        };
        mem::forget(s);
        rv
    }

    pub unsafe fn free(&mut self) {
        if self.owned && !self.data.is_null() {
            String::from_raw_parts(self.data as *mut _, self.len, self.len);
            self.data = ptr::null_mut();
            self.len = 0;
            self.owned = false;
        }
    }
}

impl Drop for FfiStr {
    fn drop(&mut self) {
        unsafe {
            self.free();
        }
    }
}

/// A token with byte offsets into the original input.
#[repr(C)]
pub struct CHuqieToken {
    pub text: FfiStr,
    pub start_offset: u32,
    pub end_offset: u32,
}

#[repr(C)]
pub struct CHuqieTokens {
    pub tokens: *mut CHuqieToken,
    pub len: usize,
}

/// Frees a ffi str.
///
/// If the string is marked as not owned then this function does not
/// do anything.
#[no_mangle]
pub unsafe extern "C" fn huqie_str_free(s: *mut FfiStr) {
    if !s.is_null() {
        (*s).free()
    }
}

/// Creates an analyzer handle for the given resource root. No resources
/// are read until [`huqie_load`] is called.
#[no_mangle]
pub unsafe extern "C" fn huqie_new(root_dir: *const c_char, len: usize) -> *mut CHuqie {
    let c_str = CFixedStr::from_ptr(root_dir, len);
    let root = String::from_utf8_lossy(c_str.as_bytes_full()).into_owned();
    Box::into_raw(Box::new(CHuqie {
        root: PathBuf::from(root),
        analyzer: None,
    }))
}

/// Loads the resource bundle. Returns 0 on success, -1 when any resource
/// is missing or malformed.
#[no_mangle]
pub unsafe extern "C" fn huqie_load(handle: *mut CHuqie) -> i32 {
    let h = &mut *handle;
    match Huqie::from_dir(&h.root) {
        Ok(analyzer) => {
            h.analyzer = Some(analyzer);
            0
        }
        Err(_) => -1,
    }
}

#[no_mangle]
pub unsafe extern "C" fn huqie_set_fine_grained(handle: *mut CHuqie, on: bool) {
    if let Some(analyzer) = (*handle).analyzer.as_mut() {
        analyzer.set_fine_grained(on);
    }
}

#[no_mangle]
pub unsafe extern "C" fn huqie_set_enable_position(handle: *mut CHuqie, on: bool) {
    if let Some(analyzer) = (*handle).analyzer.as_mut() {
        analyzer.set_enable_position(on);
    }
}

/// Tokenizes to a space-joined string. The result must be freed with
/// [`huqie_str_free`] wrapped in a `FfiStr`, or via `huqie_result_free`.
#[no_mangle]
pub unsafe extern "C" fn huqie_tokenize(
    handle: *mut CHuqie,
    text: *const c_char,
    len: usize,
) -> *mut FfiStr {
    let analyzer = match (*handle).analyzer.as_ref() {
        Some(a) => a,
        None => return ptr::null_mut(),
    };
    let c_str = CFixedStr::from_ptr(text, len);
    let s = String::from_utf8_lossy(c_str.as_bytes_full());
    Box::into_raw(Box::new(FfiStr::from_string(analyzer.tokenize(&s))))
}

#[no_mangle]
pub unsafe extern "C" fn huqie_result_free(s: *mut FfiStr) {
    if !s.is_null() {
        drop(Box::from_raw(s));
    }
}

/// Tokenizes to a token list with offsets.
#[no_mangle]
pub unsafe extern "C" fn huqie_tokenize_with_position(
    handle: *mut CHuqie,
    text: *const c_char,
    len: usize,
) -> *mut CHuqieTokens {
    let analyzer = match (*handle).analyzer.as_ref() {
        Some(a) => a,
        None => return ptr::null_mut(),
    };
    let c_str = CFixedStr::from_ptr(text, len);
    let s = String::from_utf8_lossy(c_str.as_bytes_full());
    let terms = analyzer.tokenize_with_position(&s);
    let mut c_tokens: Vec<CHuqieToken> = terms
        .into_iter()
        .map(|t| CHuqieToken {
            text: FfiStr::from_string(t.text),
            start_offset: t.start_offset,
            end_offset: t.end_offset,
        })
        .collect();
    c_tokens.shrink_to_fit();
    let tokens_len = c_tokens.len();
    let buffer = c_tokens.as_mut_ptr();
    mem::forget(c_tokens);
    Box::into_raw(Box::new(CHuqieTokens {
        tokens: buffer,
        len: tokens_len,
    }))
}

#[no_mangle]
pub unsafe extern "C" fn huqie_tokens_free(tokens: *mut CHuqieTokens) {
    if !tokens.is_null() {
        let list = Box::from_raw(tokens);
        Vec::from_raw_parts(list.tokens, list.len, list.len);
    }
}

/// Approximate raw dictionary frequency of a term, 0 when unknown.
#[no_mangle]
pub unsafe extern "C" fn huqie_freq(handle: *mut CHuqie, term: *const c_char, len: usize) -> i32 {
    let analyzer = match (*handle).analyzer.as_ref() {
        Some(a) => a,
        None => return 0,
    };
    let c_str = CFixedStr::from_ptr(term, len);
    let s = String::from_utf8_lossy(c_str.as_bytes_full());
    analyzer.freq(&s)
}

/// POS tag of a term, an empty string when unknown.
#[no_mangle]
pub unsafe extern "C" fn huqie_tag(
    handle: *mut CHuqie,
    term: *const c_char,
    len: usize,
) -> *mut FfiStr {
    let analyzer = match (*handle).analyzer.as_ref() {
        Some(a) => a,
        None => return ptr::null_mut(),
    };
    let c_str = CFixedStr::from_ptr(term, len);
    let s = String::from_utf8_lossy(c_str.as_bytes_full());
    Box::into_raw(Box::new(FfiStr::from_string(analyzer.tag(&s).to_string())))
}

#[no_mangle]
pub unsafe extern "C" fn huqie_free(handle: *mut CHuqie) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}
