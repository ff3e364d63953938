use std::{
    env,
    net::IpAddr,
    time::{Duration, Instant},
};

use dashmap::DashMap;
use rocket::{
    http::Status,
    request::{self, FromRequest, Request},
};
use tracing::debug;

#[derive(Debug)]
struct TokenBucket {
    last_refill: Instant,
    tokens: u32,
}

impl TokenBucket {
    fn new(capacity: u32) -> Self {
        Self {
            last_refill: Instant::now(),
            tokens: capacity,
        }
    }

    fn try_consume(&mut self, capacity: u32, refill_interval: Duration) -> bool {
        self.refill(capacity, refill_interval);
        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }

    fn refill(&mut self, capacity: u32, refill_interval: Duration) {
        let intervals = self.last_refill.elapsed().as_secs() / refill_interval.as_secs();
        if intervals > 0 {
            // Refills to full capacity once per interval.
            self.tokens = capacity;
            self.last_refill = Instant::now();
        }
    }
}

/// Per-client-IP limiter on room creation.
pub struct RateLimiter {
    buckets: DashMap<IpAddr, TokenBucket>,
    capacity: u32,
    refill_interval: Duration,
}

impl RateLimiter {
    /// Reads `RATE_LIMIT_ROOMS_PER_MINUTE` (default 10) once at startup.
    pub fn from_env() -> Self {
        let capacity: u32 = env::var("RATE_LIMIT_ROOMS_PER_MINUTE")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);
        Self::new(capacity, Duration::from_secs(60))
    }

    pub fn new(capacity: u32, refill_interval: Duration) -> Self {
        Self {
            buckets: DashMap::new(),
            capacity,
            refill_interval,
        }
    }

    pub fn check(&self, client_ip: &ClientIp) -> Result<(), Status> {
        let mut bucket = self
            .buckets
            .entry(client_ip.0)
            .or_insert_with(|| TokenBucket::new(self.capacity));

        if bucket.try_consume(self.capacity, self.refill_interval) {
            debug!("rate limit check passed for {}", client_ip.0);
            Ok(())
        } else {
            Err(Status::TooManyRequests)
        }
    }
}

pub struct ClientIp(pub IpAddr);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ClientIp {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let ip = req
            .headers()
            .get_one("X-Forwarded-For")
            .and_then(|header| header.split(',').next())
            .and_then(|ip| ip.trim().parse().ok())
            .or_else(|| {
                req.headers()
                    .get_one("X-Real-IP")
                    .and_then(|ip| ip.parse().ok())
            })
            .or_else(|| req.client_ip())
            .unwrap_or_else(|| "127.0.0.1".parse().unwrap());

        request::Outcome::Success(ClientIp(ip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consumes_until_capacity_then_rejects() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let ip = ClientIp("10.0.0.1".parse().unwrap());

        for _ in 0..3 {
            assert!(limiter.check(&ip).is_ok());
        }
        assert_eq!(limiter.check(&ip), Err(Status::TooManyRequests));
    }

    #[test]
    fn separate_ips_have_separate_buckets() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let a = ClientIp("10.0.0.1".parse().unwrap());
        let b = ClientIp("10.0.0.2".parse().unwrap());

        assert!(limiter.check(&a).is_ok());
        assert!(limiter.check(&b).is_ok());
        assert!(limiter.check(&a).is_err());
    }
}
