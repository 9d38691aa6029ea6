//! Iterative radix-2 Cooley-Tukey FFT over a real-input buffer.

use std::f64::consts::PI;

/// Magnitudes of the non-negative frequency bins of one transform.
///
/// Holds `fft_size / 2` values; bin `i` sits at `i * sample_rate / fft_size` Hz.
#[derive(Clone, Debug, PartialEq)]
pub struct MagnitudeSpectrum {
    magnitudes: Vec<f64>,
    fft_size: usize,
    sample_rate: u32,
}

impl MagnitudeSpectrum {
    pub fn magnitudes(&self) -> &[f64] {
        &self.magnitudes
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.magnitudes.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.magnitudes.is_empty()
    }

    /// Frequency resolution in Hz.
    pub fn bin_width(&self) -> f64 {
        self.sample_rate as f64 / self.fft_size as f64
    }

    /// Bins paired with their centre frequency.
    pub fn bins(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        let width = self.bin_width();
        self.magnitudes
            .iter()
            .enumerate()
            .map(move |(i, &mag)| (i as f64 * width, mag))
    }

    /// Index of the strongest bin, if any.
    #[cfg(test)]
    pub fn peak_bin(&self) -> Option<usize> {
        self.magnitudes
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
    }
}

/// Real/imaginary work buffers sized once to a power of two.
///
/// Reusing one instance across transforms of the same size avoids
/// reallocating on every call.
pub struct FftBuffers {
    re: Vec<f64>,
    im: Vec<f64>,
}

impl FftBuffers {
    /// Panics if `size` is not a power of two.
    pub fn new(size: usize) -> Self {
        assert!(size.is_power_of_two(), "FFT size must be a power of two, got {size}");
        Self {
            re: vec![0.0; size],
            im: vec![0.0; size],
        }
    }

    /// Copy `input` into the real part, zero-padding the tail.
    pub fn load(&mut self, input: &[f64]) {
        let n = input.len().min(self.re.len());
        self.re[..n].copy_from_slice(&input[..n]);
        self.re[n..].fill(0.0);
        self.im.fill(0.0);
    }

    pub fn transform(&mut self) {
        fft_in_place(&mut self.re, &mut self.im);
    }

    /// Magnitudes of the first half of the transformed bins.
    pub fn half_magnitudes(&self) -> Vec<f64> {
        let half = self.re.len() / 2;
        self.re[..half]
            .iter()
            .zip(&self.im[..half])
            .map(|(re, im)| re.hypot(*im))
            .collect()
    }
}

/// Smallest power of two `>= len` (1 for an empty input).
pub fn fft_size_for(len: usize) -> usize {
    len.next_power_of_two()
}

/// Forward complex FFT in place. Both slices must share a power-of-two length.
pub fn fft_in_place(re: &mut [f64], im: &mut [f64]) {
    let n = re.len();
    debug_assert_eq!(n, im.len());
    debug_assert!(n.is_power_of_two());
    if n < 2 {
        return;
    }

    // Bit-reversal permutation
    let mut j = 0usize;
    for i in 1..n {
        let mut bit = n >> 1;
        while j & bit != 0 {
            j ^= bit;
            bit >>= 1;
        }
        j |= bit;
        if i < j {
            re.swap(i, j);
            im.swap(i, j);
        }
    }

    // Butterflies, stage sizes 2, 4, 8, ... n
    let mut len = 2;
    while len <= n {
        let angle = -2.0 * PI / len as f64;
        let half = len / 2;
        for start in (0..n).step_by(len) {
            for k in 0..half {
                let (w_im, w_re) = (angle * k as f64).sin_cos();
                let a = start + k;
                let b = a + half;
                let t_re = re[b] * w_re - im[b] * w_im;
                let t_im = re[b] * w_im + im[b] * w_re;
                re[b] = re[a] - t_re;
                im[b] = im[a] - t_im;
                re[a] += t_re;
                im[a] += t_im;
            }
        }
        len <<= 1;
    }
}

/// Zero-pad `windowed` to the next power of two and return its magnitude spectrum.
pub fn magnitude_spectrum(windowed: &[f64], sample_rate: u32) -> MagnitudeSpectrum {
    let fft_size = fft_size_for(windowed.len());
    let mut buffers = FftBuffers::new(fft_size);
    buffers.load(windowed);
    buffers.transform();
    MagnitudeSpectrum {
        magnitudes: buffers.half_magnitudes(),
        fft_size,
        sample_rate,
    }
}
