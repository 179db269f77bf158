pub mod ecpay;
