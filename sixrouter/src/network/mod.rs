pub mod datalink;
pub mod device;
pub mod packet;
