//! Userspace pointer validation and memory copies
//!
//! The control plane receives its arguments as raw userspace addresses.
//! These helpers validate an address range before touching it so a bad
//! pointer becomes EFAULT instead of a kernel-memory access.

use super::errno::EFAULT;

/// Userspace address range - below the kernel split
/// On x86_64, the canonical address split is at 0x0000_8000_0000_0000
/// Addresses at or above this value are kernel addresses
#[cfg(not(target_arch = "aarch64"))]
const USER_SPACE_END: u64 = 0x0000_8000_0000_0000;

/// On aarch64, TTBR0 covers the full 48-bit lower half
#[cfg(target_arch = "aarch64")]
const USER_SPACE_END: u64 = 0x0001_0000_0000_0000;

/// Validate that `len` bytes starting at `addr` lie in userspace
///
/// Checks that the address is not null, is below the kernel split, and that
/// the end of the range neither overflows nor crosses into kernel space.
pub fn validate_user_range(addr: u64, len: usize) -> Result<(), i32> {
    if addr == 0 {
        return Err(EFAULT);
    }

    if addr >= USER_SPACE_END {
        return Err(EFAULT);
    }

    if addr
        .checked_add(len as u64)
        .map_or(true, |end| end > USER_SPACE_END)
    {
        return Err(EFAULT);
    }

    Ok(())
}

/// Validate that a userspace pointer is safe to read from
pub fn validate_user_ptr_read<T>(ptr: *const T) -> Result<(), i32> {
    validate_user_range(ptr as u64, core::mem::size_of::<T>())
}

/// Validate that a userspace pointer is safe to write to
pub fn validate_user_ptr_write<T>(ptr: *mut T) -> Result<(), i32> {
    validate_user_ptr_read(ptr as *const T)
}

/// Copy a value from userspace to kernel
pub fn copy_from_user<T: Copy>(ptr: *const T) -> Result<T, i32> {
    validate_user_ptr_read(ptr)?;

    // SAFETY: The range [ptr, ptr + size_of::<T>()) was validated to be
    // non-null and entirely in userspace. Mapping faults are the page-fault
    // handler's concern.
    let value = unsafe { core::ptr::read_volatile(ptr) };

    Ok(value)
}

/// Copy a value from kernel to userspace
pub fn copy_to_user<T: Copy>(ptr: *mut T, value: &T) -> Result<(), i32> {
    validate_user_ptr_write(ptr)?;

    // SAFETY: Same validation as copy_from_user.
    unsafe {
        core::ptr::write_volatile(ptr, *value);
    }

    Ok(())
}

/// Copy a byte slice from kernel to userspace
pub fn copy_bytes_to_user(addr: u64, bytes: &[u8]) -> Result<(), i32> {
    validate_user_range(addr, bytes.len())?;

    // SAFETY: The whole destination range was validated above and cannot
    // overlap kernel-owned `bytes`.
    unsafe {
        core::ptr::copy_nonoverlapping(bytes.as_ptr(), addr as *mut u8, bytes.len());
    }

    Ok(())
}
