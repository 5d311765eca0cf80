//! Flag constants of the metadata tables (ECMA-335 II.23.1).

use bitflags::bitflags;

#[allow(non_snake_case)]
/// All possible flags for `TypeAttributes`
pub mod TypeAttributes {
    /// Use this mask to retrieve visibility information. These 3 bits contain one of the following values:
    pub const VISIBILITY_MASK: u32 = 0x0000_0007;
    /// Class has no public scope
    pub const NOT_PUBLIC: u32 = 0x0000_0000;
    /// Class has public scope
    pub const PUBLIC: u32 = 0x0000_0001;
    /// Class is nested with public visibility
    pub const NESTED_PUBLIC: u32 = 0x0000_0002;
    /// Class is nested with private visibility
    pub const NESTED_PRIVATE: u32 = 0x0000_0003;
    /// Class is nested with family visibility
    pub const NESTED_FAMILY: u32 = 0x0000_0004;
    /// Class is nested with assembly visibility
    pub const NESTED_ASSEMBLY: u32 = 0x0000_0005;
    /// Class is nested with family and assembly visibility
    pub const NESTED_FAM_AND_ASSEM: u32 = 0x0000_0006;
    /// Class is nested with family or assembly visibility
    pub const NESTED_FAM_OR_ASSEM: u32 = 0x0000_0007;
    /// Any of these bits set means the type is nested
    pub const NESTED_MASK: u32 = 0x0000_0006;
    //
    /// Use this mask to retrieve class layout information. These 2 bits contain one of the following values:
    pub const LAYOUT_MASK: u32 = 0x0000_0018;
    /// Class fields are auto-laid out
    pub const AUTO_LAYOUT: u32 = 0x0000_0000;
    /// Class fields are laid out sequentially
    pub const SEQUENTIAL_LAYOUT: u32 = 0x0000_0008;
    /// Layout is supplied explicitly
    pub const EXPLICIT_LAYOUT: u32 = 0x0000_0010;
    //
    /// Use this mask to retrieve class semantics information
    pub const CLASS_SEMANTICS_MASK: u32 = 0x0000_0020;
    /// Type is a class
    pub const CLASS: u32 = 0x0000_0000;
    /// Type is an interface
    pub const INTERFACE: u32 = 0x0000_0020;
    /// Class is abstract
    pub const ABSTRACT: u32 = 0x0000_0080;
    /// Class cannot be extended
    pub const SEALED: u32 = 0x0000_0100;
    /// Class name is special
    pub const SPECIAL_NAME: u32 = 0x0000_0400;
    /// Class/Interface is imported
    pub const IMPORT: u32 = 0x0000_1000;
    /// Reserved (Class is serializable)
    pub const SERIALIZABLE: u32 = 0x0000_2000;
    /// Windows Runtime type
    pub const WINDOWS_RUNTIME: u32 = 0x0000_4000;
    /// `ExportedType` row is a type forwarder
    pub const FORWARDER: u32 = 0x0020_0000;
}

#[allow(non_snake_case)]
/// All possible flags for `AssemblyFlags`
pub mod AssemblyFlags {
    /// The assembly reference holds the full (unhashed) public key
    pub const PUBLIC_KEY: u32 = 0x0001;
    /// The implementation of this assembly used at runtime is not expected to match the version seen at compile time
    pub const RETARGETABLE: u32 = 0x0100;
    /// Mask of the 3 bits holding the content type
    pub const CONTENT_TYPE_MASK: u32 = 0x0E00;
    /// Reserved (a conforming implementation of the CLI may ignore this setting on read)
    pub const DISABLE_JIT_COMPILE_OPTIMIZER: u32 = 0x4000;
    /// Reserved (a conforming implementation of the CLI may ignore this setting on read)
    pub const ENABLE_JIT_COMPILE_TRACKING: u32 = 0x8000;
}

#[allow(non_snake_case)]
/// All possible values for `AssemblyHashAlgorithm`
pub mod AssemblyHashAlgorithm {
    /// No hash algorithm specified
    pub const NONE: u32 = 0x0000;
    /// MD5 hash algorithm
    pub const MD5: u32 = 0x8003;
    /// SHA1 hash algorithm
    pub const SHA1: u32 = 0x8004;
    /// SHA256 hash algorithm
    pub const SHA256: u32 = 0x800C;
    /// SHA384 hash algorithm
    pub const SHA384: u32 = 0x800D;
    /// SHA512 hash algorithm
    pub const SHA512: u32 = 0x800E;
}

#[allow(non_snake_case)]
/// All possible flags for `FileAttributes`
pub mod FileAttributes {
    /// This is not a resource file
    pub const CONTAINS_META_DATA: u32 = 0x0000;
    /// This is a resource file or other non-metadata-containing file
    pub const CONTAINS_NO_META_DATA: u32 = 0x0001;
}

#[allow(non_snake_case)]
/// All possible flags for `PInvokeAttributes`
pub mod PInvokeAttributes {
    /// `PInvoke` is to use the member name as specified
    pub const NO_MANGLE: u32 = 0x0001;
    /// Character set mask
    pub const CHAR_SET_MASK: u32 = 0x0006;
    /// Strings are marshalled as ANSI
    pub const CHAR_SET_ANSI: u32 = 0x0002;
    /// Strings are marshalled as Unicode
    pub const CHAR_SET_UNICODE: u32 = 0x0004;
    /// Information about target function. Not relevant for fields
    pub const SUPPORTS_LAST_ERROR: u32 = 0x0040;
    /// Calling convention mask
    pub const CALL_CONV_MASK: u32 = 0x0700;
    /// Calling convention = `WinAPI`
    pub const CALL_CONV_WINAPI: u32 = 0x0100;
    /// Calling convention = C
    pub const CALL_CONV_CDECL: u32 = 0x0200;
    /// Calling convention = `StdCall`
    pub const CALL_CONV_STDCALL: u32 = 0x0300;
}

bitflags! {
    #[derive(PartialEq, Eq, Debug, Clone, Copy)]
    /// All possible flags for ManifestResourceAttributes
    pub struct ManifestResourceAttributes : u32 {
        /// The Resource is exported from the Assembly
        const PUBLIC = 0x0001;
        /// The Resource is private to the Assembly
        const PRIVATE = 0x0002;
    }
}
